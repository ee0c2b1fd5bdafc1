// Resource ledger: allocated limits and current consumption per
// administrator. The store is the single source of truth; counters are
// never cached across calls.

use std::sync::Arc;

use crate::database::store::{AdminSelector, AdminStore};
use crate::error::AdminError;
use crate::resources::{ResourceKind, ResourceLimit, ResourceUsage};
use crate::types::AdminId;

/// Callback fired after a usage adjustment has been applied. The reseller
/// hierarchy hooks in here to roll deltas up into parent aggregates.
pub trait UsageObserver: Send + Sync {
    fn on_usage_changed(&self, admin_id: AdminId, kind: ResourceKind, delta: i64);
}

pub struct ResourceLedger {
    store: Arc<dyn AdminStore>,
    observers: Vec<Arc<dyn UsageObserver>>,
}

impl ResourceLedger {
    pub fn new(store: Arc<dyn AdminStore>) -> Self {
        Self {
            store,
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn UsageObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Current consumption for one kind.
    pub async fn usage(&self, admin_id: AdminId, kind: ResourceKind) -> Result<i64, AdminError> {
        let vector = self.store.usage_vector(admin_id).await?;
        Ok(vector.get(kind))
    }

    /// Full usage vector.
    pub async fn usage_vector(&self, admin_id: AdminId) -> Result<ResourceUsage, AdminError> {
        Ok(self.store.usage_vector(admin_id).await?)
    }

    /// Allocated limit for one kind.
    pub async fn limit(
        &self,
        admin_id: AdminId,
        kind: ResourceKind,
    ) -> Result<ResourceLimit, AdminError> {
        let selector = AdminSelector::Id(admin_id);
        let admin = self
            .store
            .find_admin(&selector)
            .await?
            .ok_or_else(|| AdminError::NotFound(selector.describe()))?;
        Ok(admin.limits.get(kind))
    }

    /// Apply a delta to a usage counter. The result may never go
    /// negative; violations are rejected without a write. The optional
    /// `detail_key` books the delta against a per-object sub-resource
    /// (per-mailbox quota, per-domain disk usage) alongside the aggregate.
    ///
    /// The read-check-write is not atomic; two racing adjustments on the
    /// same admin are resolved by the store's row-level update, which is
    /// an accepted limitation of this layer.
    pub async fn adjust_usage(
        &self,
        admin_id: AdminId,
        kind: ResourceKind,
        delta: i64,
        detail_key: Option<&str>,
    ) -> Result<i64, AdminError> {
        let current = self.usage(admin_id, kind).await?;
        if current + delta < 0 {
            return Err(AdminError::InvalidDelta {
                kind,
                current,
                delta,
            });
        }

        let updated = self
            .store
            .adjust_usage(admin_id, kind, delta, detail_key)
            .await?;

        for observer in &self.observers {
            observer.on_usage_changed(admin_id, kind, delta);
        }
        Ok(updated)
    }

    /// Book one more consumed unit, e.g. on customer or domain creation.
    pub async fn increase(
        &self,
        admin_id: AdminId,
        kind: ResourceKind,
        detail_key: Option<&str>,
    ) -> Result<i64, AdminError> {
        self.adjust_usage(admin_id, kind, 1, detail_key).await
    }

    /// Release one consumed unit.
    pub async fn decrease(
        &self,
        admin_id: AdminId,
        kind: ResourceKind,
        detail_key: Option<&str>,
    ) -> Result<i64, AdminError> {
        self.adjust_usage(admin_id, kind, -1, detail_key).await
    }

    /// Trusted limit write. Callers must have passed QuotaGuard already;
    /// no validation happens here.
    pub async fn set_limit(
        &self,
        admin_id: AdminId,
        kind: ResourceKind,
        value: ResourceLimit,
    ) -> Result<(), AdminError> {
        Ok(self.store.set_limit(admin_id, kind, value).await?)
    }
}
