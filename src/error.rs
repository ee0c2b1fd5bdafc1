// Domain error taxonomy for administrator lifecycle operations.
use thiserror::Error;

use crate::database::store::StoreError;
use crate::resources::ResourceKind;

/// Failure of a lifecycle or ledger operation. Every variant leaves the
/// persisted state untouched; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Not allowed to execute given command")]
    Unauthorized,

    #[error("Admin with {0} could not be found")]
    NotFound(String),

    #[error("Validation failed for '{field}': {message}")]
    Validation { field: &'static str, message: String },

    #[error("Cannot set a resource limit below its current usage: {}", format_kinds(.0))]
    QuotaViolation(Vec<ResourceKind>),

    #[error("You cannot delete yourself")]
    SelfDeletionForbidden,

    #[error("Usage for '{kind}' cannot drop below zero (current {current}, delta {delta})")]
    InvalidDelta {
        kind: ResourceKind,
        current: i64,
        delta: i64,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AdminError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AdminError::Validation {
            field,
            message: message.into(),
        }
    }
}

fn format_kinds(kinds: &[ResourceKind]) -> String {
    kinds
        .iter()
        .map(|k| k.label())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_violation_lists_every_offending_kind() {
        let err = AdminError::QuotaViolation(vec![
            ResourceKind::Customers,
            ResourceKind::MailQuota,
            ResourceKind::DiskSpace,
        ]);
        let message = err.to_string();
        assert!(message.contains("customers"));
        assert!(message.contains("mail quota"));
        assert!(message.contains("disk space"));
    }
}
