// Test doubles: an in-memory store with the same observable behavior as
// the Postgres implementation, and a recording audit sink. Used by the
// integration suites and by downstream crates that test against the
// lifecycle without a database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::audit::{AuditSeverity, AuditSink};
use crate::database::models::{Admin, AdminChanges, NewAdmin};
use crate::database::store::{AdminSelector, AdminStore, AdminTransaction, StoreError};
use crate::resources::{ResourceKind, ResourceLimit, ResourceUsage};
use crate::types::AdminId;

#[derive(Debug, Clone)]
pub struct CustomerRow {
    pub id: Uuid,
    pub admin_id: AdminId,
    pub login_name: String,
}

#[derive(Debug, Clone)]
pub struct DomainRow {
    pub id: Uuid,
    pub admin_id: AdminId,
    pub domain: String,
}

#[derive(Debug, Clone)]
pub struct ApiKeyRow {
    pub id: Uuid,
    pub admin_id: AdminId,
    /// None marks an admin-level key; Some scopes the key to a customer.
    pub customer_id: Option<Uuid>,
}

#[derive(Clone, Default)]
struct MemoryState {
    admins: HashMap<AdminId, Admin>,
    usage: HashMap<AdminId, ResourceUsage>,
    usage_detail: HashMap<(AdminId, ResourceKind, String), i64>,
    customers: Vec<CustomerRow>,
    domains: Vec<DomainRow>,
    api_keys: Vec<ApiKeyRow>,
}

/// In-memory panel store. Transactions stage a full copy of the state and
/// swap it in on commit, so a dropped transaction never leaks a write.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- seed helpers -----------------------------------------------------

    pub async fn add_customer(&self, admin_id: AdminId, login_name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.customers.push(CustomerRow {
            id,
            admin_id,
            login_name: login_name.to_string(),
        });
        id
    }

    pub async fn add_domain(&self, admin_id: AdminId, domain: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.domains.push(DomainRow {
            id,
            admin_id,
            domain: domain.to_string(),
        });
        id
    }

    pub async fn add_api_key(&self, admin_id: AdminId, customer_id: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().await.api_keys.push(ApiKeyRow {
            id,
            admin_id,
            customer_id,
        });
        id
    }

    pub async fn set_failed_logins(&self, admin_id: AdminId, count: i32) {
        if let Some(admin) = self.state.lock().await.admins.get_mut(&admin_id) {
            admin.failed_logins = count;
        }
    }

    pub async fn set_usage(&self, admin_id: AdminId, kind: ResourceKind, value: i64) {
        self.state
            .lock()
            .await
            .usage
            .entry(admin_id)
            .or_default()
            .set(kind, value);
    }

    // --- inspection helpers -----------------------------------------------

    pub async fn has_admin(&self, admin_id: AdminId) -> bool {
        self.state.lock().await.admins.contains_key(&admin_id)
    }

    pub async fn customers(&self) -> Vec<CustomerRow> {
        self.state.lock().await.customers.clone()
    }

    pub async fn domains(&self) -> Vec<DomainRow> {
        self.state.lock().await.domains.clone()
    }

    pub async fn api_keys(&self) -> Vec<ApiKeyRow> {
        self.state.lock().await.api_keys.clone()
    }

    pub async fn has_usage_rows(&self, admin_id: AdminId) -> bool {
        let state = self.state.lock().await;
        state.usage.contains_key(&admin_id)
            || state.usage_detail.keys().any(|(id, _, _)| *id == admin_id)
    }

    pub async fn usage_detail(
        &self,
        admin_id: AdminId,
        kind: ResourceKind,
        detail_key: &str,
    ) -> Option<i64> {
        self.state
            .lock()
            .await
            .usage_detail
            .get(&(admin_id, kind, detail_key.to_string()))
            .copied()
    }
}

fn login_matches(stored: &str, wanted: &str) -> bool {
    stored.eq_ignore_ascii_case(wanted)
}

#[async_trait]
impl AdminStore for MemoryStore {
    async fn find_admin(&self, selector: &AdminSelector) -> Result<Option<Admin>, StoreError> {
        let state = self.state.lock().await;
        let admin = match selector {
            AdminSelector::Id(id) => state.admins.get(id).cloned(),
            AdminSelector::LoginName(login_name) => state
                .admins
                .values()
                .find(|a| login_matches(&a.login_name, login_name))
                .cloned(),
        };
        Ok(admin)
    }

    async fn list_admins(&self) -> Result<Vec<Admin>, StoreError> {
        let state = self.state.lock().await;
        let mut admins: Vec<Admin> = state.admins.values().cloned().collect();
        admins.sort_by(|a, b| a.login_name.cmp(&b.login_name));
        Ok(admins)
    }

    async fn login_name_taken(&self, login_name: &str) -> Result<bool, StoreError> {
        let state = self.state.lock().await;
        let taken = state
            .admins
            .values()
            .any(|a| login_matches(&a.login_name, login_name))
            || state
                .customers
                .iter()
                .any(|c| login_matches(&c.login_name, login_name));
        Ok(taken)
    }

    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin, StoreError> {
        let mut state = self.state.lock().await;
        if state
            .admins
            .values()
            .any(|a| login_matches(&a.login_name, &admin.login_name))
        {
            return Err(StoreError::Conflict(format!(
                "loginname '{}' already exists",
                admin.login_name
            )));
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        let record = Admin {
            id,
            login_name: admin.login_name,
            name: admin.name,
            email: admin.email,
            language: admin.language,
            theme: admin.theme,
            custom_notes: admin.custom_notes,
            custom_notes_show: admin.custom_notes_show,
            deactivated: false,
            failed_logins: 0,
            password_hash: admin.password_hash,
            ip_restriction: admin.ip_restriction,
            permissions: admin.permissions,
            limits: admin.limits,
            created_at: now,
            updated_at: now,
        };
        state.admins.insert(id, record.clone());
        state.usage.insert(id, ResourceUsage::default());
        Ok(record)
    }

    async fn update_admin(&self, id: AdminId, changes: AdminChanges) -> Result<Admin, StoreError> {
        let mut state = self.state.lock().await;
        let admin = state
            .admins
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("admin {}", id)))?;

        admin.name = changes.name;
        admin.email = changes.email;
        admin.language = changes.language;
        admin.theme = changes.theme;
        admin.custom_notes = changes.custom_notes;
        admin.custom_notes_show = changes.custom_notes_show;
        admin.deactivated = changes.deactivated;
        admin.password_hash = changes.password_hash;
        admin.ip_restriction = changes.ip_restriction;
        admin.permissions = changes.permissions;
        admin.limits = changes.limits;
        admin.updated_at = Utc::now();
        Ok(admin.clone())
    }

    async fn reset_failed_logins(&self, id: AdminId) -> Result<Admin, StoreError> {
        let mut state = self.state.lock().await;
        let admin = state
            .admins
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("admin {}", id)))?;
        admin.failed_logins = 0;
        admin.updated_at = Utc::now();
        Ok(admin.clone())
    }

    async fn usage_vector(&self, id: AdminId) -> Result<ResourceUsage, StoreError> {
        let state = self.state.lock().await;
        if !state.admins.contains_key(&id) {
            return Err(StoreError::NotFound(format!("admin {}", id)));
        }
        Ok(state.usage.get(&id).cloned().unwrap_or_default())
    }

    async fn adjust_usage(
        &self,
        id: AdminId,
        kind: ResourceKind,
        delta: i64,
        detail_key: Option<&str>,
    ) -> Result<i64, StoreError> {
        let mut state = self.state.lock().await;
        if !state.admins.contains_key(&id) {
            return Err(StoreError::NotFound(format!("admin {}", id)));
        }

        let usage = state.usage.entry(id).or_default();
        let updated = usage.get(kind) + delta;
        usage.set(kind, updated);

        if let Some(detail_key) = detail_key {
            *state
                .usage_detail
                .entry((id, kind, detail_key.to_string()))
                .or_insert(0) += delta;
        }
        Ok(updated)
    }

    async fn set_limit(
        &self,
        id: AdminId,
        kind: ResourceKind,
        value: ResourceLimit,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let admin = state
            .admins
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("admin {}", id)))?;
        admin.limits.set(kind, value);
        admin.updated_at = Utc::now();
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn AdminTransaction>, StoreError> {
        let staged = self.state.lock().await.clone();
        Ok(Box::new(MemoryTransaction {
            shared: Arc::clone(&self.state),
            staged,
        }))
    }
}

/// Stages a copy of the whole store; commit swaps it in, drop discards it.
struct MemoryTransaction {
    shared: Arc<Mutex<MemoryState>>,
    staged: MemoryState,
}

impl MemoryTransaction {
    fn require_admin(&self, id: AdminId, role: &str) -> Result<(), StoreError> {
        if self.staged.admins.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("{} admin {}", role, id)))
        }
    }
}

#[async_trait]
impl AdminTransaction for MemoryTransaction {
    async fn delete_admin_row(&mut self, id: AdminId) -> Result<(), StoreError> {
        self.staged
            .admins
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("admin {}", id)))?;
        Ok(())
    }

    async fn purge_usage_ledgers(&mut self, id: AdminId) -> Result<(), StoreError> {
        self.staged.usage.remove(&id);
        self.staged
            .usage_detail
            .retain(|(admin_id, _, _), _| *admin_id != id);
        Ok(())
    }

    async fn reassign_customers(&mut self, from: AdminId, to: AdminId) -> Result<u64, StoreError> {
        self.require_admin(to, "successor")?;
        let mut moved = 0;
        for customer in &mut self.staged.customers {
            if customer.admin_id == from {
                customer.admin_id = to;
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn reassign_domains(&mut self, from: AdminId, to: AdminId) -> Result<u64, StoreError> {
        self.require_admin(to, "successor")?;
        let mut moved = 0;
        for domain in &mut self.staged.domains {
            if domain.admin_id == from {
                domain.admin_id = to;
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn delete_admin_api_keys(&mut self, id: AdminId) -> Result<u64, StoreError> {
        let before = self.staged.api_keys.len();
        self.staged
            .api_keys
            .retain(|key| key.admin_id != id || key.customer_id.is_some());
        Ok((before - self.staged.api_keys.len()) as u64)
    }

    async fn reassign_api_keys(&mut self, from: AdminId, to: AdminId) -> Result<u64, StoreError> {
        self.require_admin(to, "successor")?;
        let mut moved = 0;
        for key in &mut self.staged.api_keys {
            if key.admin_id == from {
                key.admin_id = to;
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut shared = self.shared.lock().await;
        *shared = self.staged;
        Ok(())
    }
}

/// A captured audit record.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub action: String,
    pub severity: AuditSeverity,
    pub message: String,
}

/// Audit sink that keeps every record for assertions.
#[derive(Default)]
pub struct RecordingAuditSink {
    records: std::sync::Mutex<Vec<AuditRecord>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().expect("audit records lock").clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, action: &str, severity: AuditSeverity, message: &str) {
        self.records.lock().expect("audit records lock").push(AuditRecord {
            action: action.to_string(),
            severity,
            message: message.to_string(),
        });
    }
}
