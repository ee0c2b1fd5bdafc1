use tracing::{info, warn};

/// Weight of an audit record, mirroring the panel's syslog-style levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AuditSeverity {
    Notice,
    Info,
    Warning,
}

/// Fire-and-forget audit trail. Implementations must never fail the
/// calling operation or touch its transaction.
pub trait AuditSink: Send + Sync {
    fn record(&self, action: &str, severity: AuditSeverity, message: &str);
}

/// Routes audit records to the tracing subscriber.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, action: &str, severity: AuditSeverity, message: &str) {
        match severity {
            AuditSeverity::Notice | AuditSeverity::Info => info!(action, "{}", message),
            AuditSeverity::Warning => warn!(action, "{}", message),
        }
    }
}

/// Swallows records; for callers that explicitly opt out of auditing.
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _action: &str, _severity: AuditSeverity, _message: &str) {}
}
