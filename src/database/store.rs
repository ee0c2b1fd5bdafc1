// Storage seam between the lifecycle core and the persistent store.
//
// `AdminStore` covers the single-statement operations; `AdminTransaction`
// is the unit of work for the multi-statement delete sequence. Dropping an
// uncommitted transaction rolls back everything issued through it, so a
// failure partway through leaves the store exactly as it was.

use async_trait::async_trait;
use thiserror::Error;

use crate::database::models::{Admin, AdminChanges, NewAdmin};
use crate::resources::{ResourceKind, ResourceLimit, ResourceUsage};
use crate::types::AdminId;

/// Errors surfaced by a store implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// How a lifecycle operation addresses its target.
#[derive(Debug, Clone)]
pub enum AdminSelector {
    Id(AdminId),
    LoginName(String),
}

impl AdminSelector {
    /// Key description used in not-found messages.
    pub fn describe(&self) -> String {
        match self {
            AdminSelector::Id(id) => format!("id #{}", id),
            AdminSelector::LoginName(login) => format!("loginname '{}'", login),
        }
    }
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    /// Resolve an administrator by id or (case-insensitive) login name.
    async fn find_admin(&self, selector: &AdminSelector) -> Result<Option<Admin>, StoreError>;

    /// All administrators, ordered by login name.
    async fn list_admins(&self) -> Result<Vec<Admin>, StoreError>;

    /// Case-insensitive probe across both the administrator and the
    /// customer login namespaces.
    async fn login_name_taken(&self, login_name: &str) -> Result<bool, StoreError>;

    /// Insert a new administrator with a zeroed usage vector.
    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin, StoreError>;

    /// Full-row update as a single atomic statement.
    async fn update_admin(&self, id: AdminId, changes: AdminChanges) -> Result<Admin, StoreError>;

    /// Reset the failed-login counter to zero.
    async fn reset_failed_logins(&self, id: AdminId) -> Result<Admin, StoreError>;

    /// Current consumption across all resource kinds.
    async fn usage_vector(&self, id: AdminId) -> Result<ResourceUsage, StoreError>;

    /// Apply `delta` to the aggregate usage counter of `kind` and return
    /// the new value. A `detail_key` additionally books the delta against
    /// the per-object detail ledger (per-mailbox quota, per-domain disk).
    async fn adjust_usage(
        &self,
        id: AdminId,
        kind: ResourceKind,
        delta: i64,
        detail_key: Option<&str>,
    ) -> Result<i64, StoreError>;

    /// Trusted limit write; quota validation already happened upstream.
    async fn set_limit(
        &self,
        id: AdminId,
        kind: ResourceKind,
        value: ResourceLimit,
    ) -> Result<(), StoreError>;

    /// Open a unit of work for the delete sequence.
    async fn begin(&self) -> Result<Box<dyn AdminTransaction>, StoreError>;
}

/// Multi-statement unit of work. All writes land together on `commit`;
/// dropping the transaction discards them.
#[async_trait]
pub trait AdminTransaction: Send {
    async fn delete_admin_row(&mut self, id: AdminId) -> Result<(), StoreError>;

    /// Drop the per-object usage detail rows (disk-space and traffic
    /// sub-ledgers included) of a removed administrator.
    async fn purge_usage_ledgers(&mut self, id: AdminId) -> Result<(), StoreError>;

    async fn reassign_customers(&mut self, from: AdminId, to: AdminId) -> Result<u64, StoreError>;

    async fn reassign_domains(&mut self, from: AdminId, to: AdminId) -> Result<u64, StoreError>;

    /// Delete API keys owned by the admin that are not scoped to a
    /// customer; those die with the account.
    async fn delete_admin_api_keys(&mut self, id: AdminId) -> Result<u64, StoreError>;

    async fn reassign_api_keys(&mut self, from: AdminId, to: AdminId) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
