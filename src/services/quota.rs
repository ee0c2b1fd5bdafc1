// Validation of proposed limit changes against current consumption.

use crate::resources::{ResourceKind, ResourceLimit, ResourceLimits, ResourceUsage};

/// Guards every limit change that reaches the trusted write surface.
/// Evaluates all kinds before reporting so one request surfaces every
/// violated resource at once.
pub struct QuotaGuard;

impl QuotaGuard {
    /// Check a proposed limit vector. A kind is rejected when its value
    /// changed, is finite, and falls below what is already in use.
    /// Widening to unlimited is always safe.
    pub fn check(
        current: &ResourceLimits,
        usage: &ResourceUsage,
        proposed: &ResourceLimits,
    ) -> Result<(), Vec<ResourceKind>> {
        let mut rejected = Vec::new();
        for kind in ResourceKind::ALL {
            let wanted = proposed.get(kind);
            if wanted == current.get(kind) {
                continue;
            }
            if let ResourceLimit::Limited(value) = wanted {
                if value < usage.get(kind) {
                    rejected.push(kind);
                }
            }
        }

        if rejected.is_empty() {
            Ok(())
        } else {
            Err(rejected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(entries: &[(ResourceKind, i64)]) -> ResourceLimits {
        let mut limits = ResourceLimits::default();
        for (kind, raw) in entries {
            limits.set(*kind, ResourceLimit::from_raw(*raw));
        }
        limits
    }

    fn usage(entries: &[(ResourceKind, i64)]) -> ResourceUsage {
        let mut usage = ResourceUsage::default();
        for (kind, used) in entries {
            usage.set(*kind, *used);
        }
        usage
    }

    #[test]
    fn decrease_below_usage_is_rejected() {
        let current = limits(&[(ResourceKind::Customers, 5)]);
        let used = usage(&[(ResourceKind::Customers, 3)]);
        let proposed = limits(&[(ResourceKind::Customers, 2)]);

        let rejected = QuotaGuard::check(&current, &used, &proposed).unwrap_err();
        assert_eq!(rejected, vec![ResourceKind::Customers]);
    }

    #[test]
    fn every_offending_kind_is_reported_at_once() {
        let current = limits(&[
            (ResourceKind::Customers, 5),
            (ResourceKind::Domains, 10),
            (ResourceKind::DiskSpace, 1024 * 1024),
        ]);
        let used = usage(&[
            (ResourceKind::Customers, 3),
            (ResourceKind::Domains, 8),
            (ResourceKind::DiskSpace, 512 * 1024),
        ]);
        let proposed = limits(&[
            (ResourceKind::Customers, 1),
            (ResourceKind::Domains, 2),
            (ResourceKind::DiskSpace, 1024),
        ]);

        let rejected = QuotaGuard::check(&current, &used, &proposed).unwrap_err();
        assert_eq!(
            rejected,
            vec![
                ResourceKind::Customers,
                ResourceKind::Domains,
                ResourceKind::DiskSpace
            ]
        );
    }

    #[test]
    fn unlimited_is_always_a_safe_widening() {
        let current = limits(&[(ResourceKind::Customers, 5)]);
        let used = usage(&[(ResourceKind::Customers, 500)]);
        let proposed = limits(&[(ResourceKind::Customers, -1)]);

        assert!(QuotaGuard::check(&current, &used, &proposed).is_ok());
    }

    #[test]
    fn unchanged_kinds_are_skipped_even_when_below_usage() {
        // a stale limit below usage is tolerated as long as it isn't touched
        let current = limits(&[(ResourceKind::Domains, 2)]);
        let used = usage(&[(ResourceKind::Domains, 4)]);
        let proposed = limits(&[(ResourceKind::Domains, 2)]);

        assert!(QuotaGuard::check(&current, &used, &proposed).is_ok());
    }

    #[test]
    fn decrease_down_to_exact_usage_is_allowed() {
        let current = limits(&[(ResourceKind::Customers, 5)]);
        let used = usage(&[(ResourceKind::Customers, 3)]);
        let proposed = limits(&[(ResourceKind::Customers, 3)]);

        assert!(QuotaGuard::check(&current, &used, &proposed).is_ok());
    }
}
