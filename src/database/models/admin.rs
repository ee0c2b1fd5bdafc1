use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use crate::auth::{AdminSession, Capability};
use crate::resources::{ResourceKind, ResourceLimit, ResourceLimits};
use crate::types::AdminId;

/// Per-account permission flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminPermissions {
    pub change_server_settings: bool,
    pub edit_php_settings: bool,
    pub customers_see_all: bool,
    pub domains_see_all: bool,
    pub tickets_see_all: bool,
}

/// Canonical three-state login IP restriction. The column encoding is
/// `NULL` for unrestricted, `[]` for an empty allow-set, otherwise a JSON
/// array of addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpRestriction {
    #[default]
    Unrestricted,
    Empty,
    Allowed(Vec<IpAddr>),
}

impl IpRestriction {
    /// Collapse `Allowed([])` into `Empty` and sort/dedup the allow-set.
    pub fn normalized(self) -> Self {
        match self {
            IpRestriction::Allowed(mut addresses) => {
                addresses.sort();
                addresses.dedup();
                if addresses.is_empty() {
                    IpRestriction::Empty
                } else {
                    IpRestriction::Allowed(addresses)
                }
            }
            other => other,
        }
    }

    pub fn to_column(&self) -> Option<String> {
        match self {
            IpRestriction::Unrestricted => None,
            IpRestriction::Empty => Some("[]".to_string()),
            IpRestriction::Allowed(addresses) => {
                Some(serde_json::to_string(addresses).unwrap_or_else(|_| "[]".to_string()))
            }
        }
    }

    pub fn from_column(raw: Option<&str>) -> Self {
        let raw = match raw {
            None => return IpRestriction::Unrestricted,
            Some(raw) => raw.trim(),
        };
        // legacy rows used "-1" or an empty string for "no restriction"
        if raw.is_empty() || raw == "-1" {
            return IpRestriction::Unrestricted;
        }
        match serde_json::from_str::<Vec<IpAddr>>(raw) {
            Ok(addresses) => IpRestriction::Allowed(addresses).normalized(),
            Err(_) => IpRestriction::Unrestricted,
        }
    }
}

/// A privileged administrator account. Usage counters live with the
/// ledger, not on this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub id: AdminId,
    pub login_name: String,
    pub name: String,
    pub email: String,
    pub language: String,
    pub theme: String,
    pub custom_notes: String,
    pub custom_notes_show: bool,
    pub deactivated: bool,
    pub failed_logins: i32,
    /// Opaque one-way credential; plaintext is never stored.
    pub password_hash: String,
    pub ip_restriction: IpRestriction,
    pub permissions: AdminPermissions,
    pub limits: ResourceLimits,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Admin {
    /// Caller identity carrying exactly this account's capabilities.
    pub fn session(&self) -> AdminSession {
        let mut session = AdminSession::new(self.id);
        let flags = [
            (
                self.permissions.change_server_settings,
                Capability::ChangeServerSettings,
            ),
            (self.permissions.edit_php_settings, Capability::EditPhpSettings),
            (self.permissions.customers_see_all, Capability::CustomersSeeAll),
            (self.permissions.domains_see_all, Capability::DomainsSeeAll),
            (self.permissions.tickets_see_all, Capability::TicketsSeeAll),
        ];
        for (enabled, capability) in flags {
            if enabled {
                session = session.with_capability(capability);
            }
        }
        session
    }
}

impl<'r> FromRow<'r, PgRow> for Admin {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let mut limits = ResourceLimits::default();
        for kind in ResourceKind::ALL {
            let raw: i64 = row.try_get(kind.as_str())?;
            limits.set(kind, ResourceLimit::from_raw(raw));
        }

        let ip: Option<String> = row.try_get("ip")?;

        Ok(Admin {
            id: row.try_get("id")?,
            login_name: row.try_get("loginname")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            language: row.try_get("def_language")?,
            theme: row.try_get("theme")?,
            custom_notes: row.try_get("custom_notes")?,
            custom_notes_show: row.try_get("custom_notes_show")?,
            deactivated: row.try_get("deactivated")?,
            failed_logins: row.try_get("loginfail_count")?,
            password_hash: row.try_get("password")?,
            ip_restriction: IpRestriction::from_column(ip.as_deref()),
            permissions: AdminPermissions {
                change_server_settings: row.try_get("change_serversettings")?,
                edit_php_settings: row.try_get("caneditphpsettings")?,
                customers_see_all: row.try_get("customers_see_all")?,
                domains_see_all: row.try_get("domains_see_all")?,
                tickets_see_all: row.try_get("tickets_see_all")?,
            },
            limits,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Insert record for a new administrator.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub login_name: String,
    pub name: String,
    pub email: String,
    pub language: String,
    pub theme: String,
    pub custom_notes: String,
    pub custom_notes_show: bool,
    pub password_hash: String,
    pub ip_restriction: IpRestriction,
    pub permissions: AdminPermissions,
    pub limits: ResourceLimits,
}

/// Full-row update record; the lifecycle has already merged caller input
/// with the stored values.
#[derive(Debug, Clone)]
pub struct AdminChanges {
    pub name: String,
    pub email: String,
    pub language: String,
    pub theme: String,
    pub custom_notes: String,
    pub custom_notes_show: bool,
    pub deactivated: bool,
    pub password_hash: String,
    pub ip_restriction: IpRestriction,
    pub permissions: AdminPermissions,
    pub limits: ResourceLimits,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_restriction_column_round_trip() {
        assert_eq!(IpRestriction::Unrestricted.to_column(), None);
        assert_eq!(IpRestriction::Empty.to_column().as_deref(), Some("[]"));

        let set = IpRestriction::Allowed(vec!["10.0.0.1".parse().unwrap()]);
        let column = set.to_column();
        assert_eq!(IpRestriction::from_column(column.as_deref()), set);
    }

    #[test]
    fn legacy_sentinels_mean_unrestricted() {
        assert_eq!(IpRestriction::from_column(None), IpRestriction::Unrestricted);
        assert_eq!(
            IpRestriction::from_column(Some("-1")),
            IpRestriction::Unrestricted
        );
        assert_eq!(
            IpRestriction::from_column(Some("")),
            IpRestriction::Unrestricted
        );
        assert_eq!(IpRestriction::from_column(Some("[]")), IpRestriction::Empty);
    }

    #[test]
    fn normalization_collapses_empty_allow_sets() {
        assert_eq!(
            IpRestriction::Allowed(vec![]).normalized(),
            IpRestriction::Empty
        );

        let a: IpAddr = "10.0.0.2".parse().unwrap();
        let b: IpAddr = "10.0.0.1".parse().unwrap();
        assert_eq!(
            IpRestriction::Allowed(vec![a, b, a]).normalized(),
            IpRestriction::Allowed(vec![b, a])
        );
    }
}
