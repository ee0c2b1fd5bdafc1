// Administrator lifecycle: create, update, delete, unlock, plus the list
// and get reads. Each operation evaluates the caller's capabilities once,
// resolves its target before any mutation, and leaves the store untouched
// on every error path.

use std::sync::Arc;

use serde::Deserialize;

use crate::audit::{AuditSeverity, AuditSink, TracingAuditSink};
use crate::auth::{AuthContext, Capability};
use crate::config::{config, FeatureFlags};
use crate::credentials::{CredentialHasher, Sha256Hasher};
use crate::database::models::{Admin, AdminChanges, AdminPermissions, IpRestriction, NewAdmin};
use crate::database::store::{AdminSelector, AdminStore, AdminTransaction, StoreError};
use crate::error::AdminError;
use crate::resources::{ResourceKind, ResourceLimit, ResourceLimitPatch, ResourceLimits};
use crate::services::ownership::OwnershipTransfer;
use crate::services::quota::QuotaGuard;
use crate::types::Flag;

/// Create request. Limits are in caller units (disk MiB, traffic GiB);
/// absent kinds start at zero.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateAdmin {
    pub login_name: String,
    pub name: String,
    pub email: String,
    /// Absent or empty: a password is generated.
    pub password: Option<String>,
    pub language: Option<String>,
    pub theme: Option<String>,
    pub custom_notes: Option<String>,
    #[serde(default)]
    pub custom_notes_show: Flag,
    #[serde(default)]
    pub change_server_settings: Flag,
    #[serde(default)]
    pub edit_php_settings: Flag,
    #[serde(default)]
    pub customers_see_all: Flag,
    #[serde(default)]
    pub domains_see_all: Flag,
    #[serde(default)]
    pub tickets_see_all: Flag,
    #[serde(default)]
    pub ip_restriction: IpRestriction,
    #[serde(default)]
    pub limits: ResourceLimitPatch,
}

/// Update request. Absent fields keep their stored values. On self-edit
/// the deactivated flag, the privilege and visibility flags, the IP
/// restriction and the whole limit vector are forced back to their stored
/// values without an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAdmin {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Only a non-empty value is rehashed; otherwise the stored credential
    /// is preserved verbatim.
    pub password: Option<String>,
    pub language: Option<String>,
    pub theme: Option<String>,
    pub custom_notes: Option<String>,
    pub custom_notes_show: Option<Flag>,
    pub deactivated: Option<Flag>,
    pub change_server_settings: Option<Flag>,
    pub edit_php_settings: Option<Flag>,
    pub customers_see_all: Option<Flag>,
    pub domains_see_all: Option<Flag>,
    pub tickets_see_all: Option<Flag>,
    pub ip_restriction: Option<IpRestriction>,
    #[serde(default)]
    pub limits: ResourceLimitPatch,
}

pub struct AdminService {
    store: Arc<dyn AdminStore>,
    hasher: Arc<dyn CredentialHasher>,
    features: Arc<dyn FeatureFlags>,
    audit: Arc<dyn AuditSink>,
}

impl AdminService {
    pub fn new(
        store: Arc<dyn AdminStore>,
        hasher: Arc<dyn CredentialHasher>,
        features: Arc<dyn FeatureFlags>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            hasher,
            features,
            audit,
        }
    }

    /// Stock collaborators: salted SHA-256 credentials, global feature
    /// toggles, audit records routed to tracing.
    pub fn with_defaults(store: Arc<dyn AdminStore>) -> Self {
        Self::new(
            store,
            Arc::new(Sha256Hasher),
            Arc::new(config().features),
            Arc::new(TracingAuditSink),
        )
    }

    /// List all administrators, ordered by login name.
    pub async fn list(&self, auth: &dyn AuthContext) -> Result<Vec<Admin>, AdminError> {
        self.require_capability(auth, Capability::ChangeServerSettings)?;

        let admins = self.store.list_admins().await?;
        self.audit
            .record("admins.list", AuditSeverity::Notice, "list admins");
        Ok(admins)
    }

    /// Fetch one administrator by id or login name. Permitted for holders
    /// of the server-settings capability and for the account itself.
    pub async fn get(
        &self,
        auth: &dyn AuthContext,
        selector: &AdminSelector,
    ) -> Result<Admin, AdminError> {
        if !auth.is_administrator() {
            return Err(AdminError::Unauthorized);
        }

        let admin = self.resolve(selector).await?;
        if !auth.has_capability(Capability::ChangeServerSettings)
            && admin.id != auth.current_admin_id()
        {
            return Err(AdminError::Unauthorized);
        }

        self.audit.record(
            "admins.get",
            AuditSeverity::Notice,
            &format!("get admin '{}'", admin.login_name),
        );
        Ok(admin)
    }

    /// Create a new administrator account.
    pub async fn create(
        &self,
        auth: &dyn AuthContext,
        request: CreateAdmin,
    ) -> Result<Admin, AdminError> {
        self.require_capability(auth, Capability::ChangeServerSettings)?;

        // login name checks: non-empty, shape, reserved prefix, uniqueness
        // across both login namespaces
        let login_name = request.login_name.trim().to_string();
        validate_login_name(&login_name)?;
        if self.store.login_name_taken(&login_name).await? {
            return Err(AdminError::validation(
                "login_name",
                format!("loginname '{}' already exists", login_name),
            ));
        }

        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AdminError::validation("name", "may not be empty"));
        }
        let email = request.email.trim().to_string();
        validate_email(&email)?;

        // limits start zeroed; the caller patch arrives in user units
        let mut limits = request
            .limits
            .to_storage_units()
            .apply(&ResourceLimits::default());
        self.apply_feature_gates(&mut limits);

        // empty password means: generate one
        let plaintext = match request.password {
            Some(password) if !password.is_empty() => password,
            _ => self.hasher.generate(),
        };
        let password_hash = self.hasher.hash(&plaintext);

        let admin = self
            .store
            .insert_admin(NewAdmin {
                login_name: login_name.clone(),
                name,
                email,
                language: non_empty_or(request.language, &config().panel.default_language),
                theme: non_empty_or(request.theme, &config().panel.default_theme),
                custom_notes: normalize_notes(request.custom_notes.unwrap_or_default()),
                custom_notes_show: request.custom_notes_show.as_bool(),
                password_hash,
                ip_restriction: request.ip_restriction.normalized(),
                permissions: AdminPermissions {
                    change_server_settings: request.change_server_settings.as_bool(),
                    edit_php_settings: request.edit_php_settings.as_bool(),
                    customers_see_all: request.customers_see_all.as_bool(),
                    domains_see_all: request.domains_see_all.as_bool(),
                    tickets_see_all: request.tickets_see_all.as_bool(),
                },
                limits,
            })
            .await
            .map_err(|err| match err {
                StoreError::Conflict(message) => AdminError::validation("login_name", message),
                other => AdminError::from(other),
            })?;

        self.audit.record(
            "admins.add",
            AuditSeverity::Warning,
            &format!("added admin '{}'", admin.login_name),
        );
        Ok(admin)
    }

    /// Update an administrator. Holders of the server-settings capability
    /// may edit anyone; everyone may edit their own profile fields.
    pub async fn update(
        &self,
        auth: &dyn AuthContext,
        selector: &AdminSelector,
        request: UpdateAdmin,
    ) -> Result<Admin, AdminError> {
        if !auth.is_administrator() {
            return Err(AdminError::Unauthorized);
        }

        let current = self.resolve(selector).await?;
        let self_edit = current.id == auth.current_admin_id();
        if !self_edit && !auth.has_capability(Capability::ChangeServerSettings) {
            return Err(AdminError::Unauthorized);
        }

        // profile fields fall back to the stored values
        let name = request.name.unwrap_or_else(|| current.name.clone());
        if name.trim().is_empty() {
            return Err(AdminError::validation("name", "may not be empty"));
        }
        let email = request.email.unwrap_or_else(|| current.email.clone());
        validate_email(email.trim())?;

        // you cannot edit some of the details of yourself
        let (deactivated, permissions, ip_restriction, mut limits) = if self_edit {
            (
                current.deactivated,
                current.permissions,
                current.ip_restriction.clone(),
                current.limits.clone(),
            )
        } else {
            let permissions = AdminPermissions {
                change_server_settings: flag_or(
                    request.change_server_settings,
                    current.permissions.change_server_settings,
                ),
                edit_php_settings: flag_or(
                    request.edit_php_settings,
                    current.permissions.edit_php_settings,
                ),
                customers_see_all: flag_or(
                    request.customers_see_all,
                    current.permissions.customers_see_all,
                ),
                domains_see_all: flag_or(
                    request.domains_see_all,
                    current.permissions.domains_see_all,
                ),
                tickets_see_all: flag_or(
                    request.tickets_see_all,
                    current.permissions.tickets_see_all,
                ),
            };
            (
                flag_or(request.deactivated, current.deactivated),
                permissions,
                request
                    .ip_restriction
                    .map(IpRestriction::normalized)
                    .unwrap_or_else(|| current.ip_restriction.clone()),
                request.limits.to_storage_units().apply(&current.limits),
            )
        };
        self.apply_feature_gates(&mut limits);

        // self-edit never reaches the guard with a changed limit
        if !self_edit {
            let usage = self.store.usage_vector(current.id).await?;
            QuotaGuard::check(&current.limits, &usage, &limits)
                .map_err(AdminError::QuotaViolation)?;
        }

        let password_hash = match request.password {
            Some(password) if !password.is_empty() => self.hasher.hash(&password),
            _ => current.password_hash.clone(),
        };

        let updated = self
            .store
            .update_admin(
                current.id,
                AdminChanges {
                    name: name.trim().to_string(),
                    email: email.trim().to_string(),
                    language: non_empty_or(request.language, &current.language),
                    theme: match request.theme {
                        Some(theme) if !theme.is_empty() => theme,
                        Some(_) => config().panel.default_theme.clone(),
                        None => current.theme.clone(),
                    },
                    custom_notes: request
                        .custom_notes
                        .map(normalize_notes)
                        .unwrap_or_else(|| current.custom_notes.clone()),
                    custom_notes_show: flag_or(request.custom_notes_show, current.custom_notes_show),
                    deactivated,
                    password_hash,
                    ip_restriction,
                    permissions,
                    limits,
                },
            )
            .await?;

        self.audit.record(
            "admins.update",
            AuditSeverity::Info,
            &format!("edited admin '{}'", updated.login_name),
        );
        Ok(updated)
    }

    /// Reset the failed-login counter. Idempotent.
    pub async fn unlock(
        &self,
        auth: &dyn AuthContext,
        selector: &AdminSelector,
    ) -> Result<Admin, AdminError> {
        self.require_capability(auth, Capability::ChangeServerSettings)?;

        let admin = self.resolve(selector).await?;
        let unlocked = self.store.reset_failed_logins(admin.id).await?;

        self.audit.record(
            "admins.unlock",
            AuditSeverity::Warning,
            &format!("unlocked admin '{}'", unlocked.login_name),
        );
        Ok(unlocked)
    }

    /// Delete an administrator and hand everything it owned to the
    /// caller. Runs as one transaction: row removal, ledger purge and
    /// ownership transfer land together or not at all. Returns the
    /// pre-deletion snapshot.
    pub async fn delete(
        &self,
        auth: &dyn AuthContext,
        selector: &AdminSelector,
    ) -> Result<Admin, AdminError> {
        self.require_capability(auth, Capability::ChangeServerSettings)?;

        let admin = self.resolve(selector).await?;

        // don't be stupid
        if admin.id == auth.current_admin_id() {
            return Err(AdminError::SelfDeletionForbidden);
        }
        let successor = auth.current_admin_id();

        let mut tx = self.store.begin().await?;
        tx.delete_admin_row(admin.id).await?;
        tx.purge_usage_ledgers(admin.id).await?;
        let summary = OwnershipTransfer::transfer(&mut *tx, admin.id, successor).await?;
        tx.commit().await?;

        self.audit.record(
            "admins.delete",
            AuditSeverity::Warning,
            &format!(
                "deleted admin '{}' ({} customers, {} domains reassigned)",
                admin.login_name, summary.customers, summary.domains
            ),
        );
        Ok(admin)
    }

    async fn resolve(&self, selector: &AdminSelector) -> Result<Admin, AdminError> {
        self.store
            .find_admin(selector)
            .await?
            .ok_or_else(|| AdminError::NotFound(selector.describe()))
    }

    fn require_capability(
        &self,
        auth: &dyn AuthContext,
        capability: Capability,
    ) -> Result<(), AdminError> {
        if auth.is_administrator() && auth.has_capability(capability) {
            Ok(())
        } else {
            Err(AdminError::Unauthorized)
        }
    }

    /// Feature-gated kinds are forced to unlimited while the feature is
    /// off, regardless of caller input.
    fn apply_feature_gates(&self, limits: &mut ResourceLimits) {
        if !self.features.is_mail_quota_enabled() {
            limits.set(ResourceKind::MailQuota, ResourceLimit::Unlimited);
        }
        if !self.features.is_ticketing_enabled() {
            limits.set(ResourceKind::Tickets, ResourceLimit::Unlimited);
        }
    }
}

fn flag_or(flag: Option<Flag>, stored: bool) -> bool {
    flag.map(Flag::as_bool).unwrap_or(stored)
}

fn non_empty_or(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(value) if !value.is_empty() => value,
        _ => fallback.to_string(),
    }
}

fn normalize_notes(notes: String) -> String {
    notes.replace("\r\n", "\n")
}

fn validate_login_name(login_name: &str) -> Result<(), AdminError> {
    if login_name.is_empty() {
        return Err(AdminError::validation("login_name", "may not be empty"));
    }
    if login_name.len() > 50 {
        return Err(AdminError::validation(
            "login_name",
            "must be at most 50 characters",
        ));
    }

    let mut chars = login_name.chars();
    let first = chars.next().unwrap_or_default();
    if !first.is_ascii_lowercase() {
        return Err(AdminError::validation(
            "login_name",
            "must start with a lowercase letter",
        ));
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_') {
        return Err(AdminError::validation(
            "login_name",
            "may only contain lowercase letters, digits, hyphens, and underscores",
        ));
    }

    // names shaped like generated system accounts are reserved
    let prefix = &config().accounts.system_account_prefix;
    if let Some(rest) = login_name.strip_prefix(prefix.as_str()) {
        if rest.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            return Err(AdminError::validation(
                "login_name",
                format!("names matching '{}<digits>' are reserved", prefix),
            ));
        }
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AdminError> {
    if email.is_empty() {
        return Err(AdminError::validation("email", "may not be empty"));
    }

    let mut parts = email.split('@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    let well_formed = parts.next().is_none()
        && !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace);

    if well_formed {
        Ok(())
    } else {
        Err(AdminError::validation(
            "email",
            format!("'{}' is not a valid address", email),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_name_shape_checks() {
        assert!(validate_login_name("alice").is_ok());
        assert!(validate_login_name("alice-2_x").is_ok());
        assert!(validate_login_name("").is_err());
        assert!(validate_login_name("Alice").is_err());
        assert!(validate_login_name("1alice").is_err());
        assert!(validate_login_name("al ice").is_err());
    }

    #[test]
    fn reserved_system_account_names_are_rejected() {
        // stock prefix is "web"
        assert!(validate_login_name("web1").is_err());
        assert!(validate_login_name("web42-x").is_err());
        assert!(validate_login_name("webmaster").is_ok());
    }

    #[test]
    fn email_shape_checks() {
        assert!(validate_email("admin@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("admin").is_err());
        assert!(validate_email("admin@localhost").is_err());
        assert!(validate_email("a@b@example.com").is_err());
        assert!(validate_email("admin@example.com ").is_err());
    }
}
