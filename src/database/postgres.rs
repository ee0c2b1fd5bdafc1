// Postgres implementation of the store seam. Runtime-checked queries
// only; uniqueness is enforced by the lower(loginname) index and surfaces
// as a Conflict.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::database::models::{Admin, AdminChanges, NewAdmin};
use crate::database::schema;
use crate::database::store::{AdminSelector, AdminStore, AdminTransaction, StoreError};
use crate::database::DatabaseManager;
use crate::resources::{ResourceKind, ResourceLimit, ResourceUsage};
use crate::types::AdminId;

const UNIQUE_VIOLATION: &str = "23505";

pub struct PgAdminStore {
    pool: PgPool,
}

impl PgAdminStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect via DATABASE_URL and make sure the schema exists.
    pub async fn connect() -> Result<Self, StoreError> {
        let pool = DatabaseManager::panel_pool().await?;
        schema::ensure_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    fn map_insert_error(err: sqlx::Error, login_name: &str) -> StoreError {
        if let sqlx::Error::Database(db) = &err {
            if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return StoreError::Conflict(format!(
                    "loginname '{}' already exists",
                    login_name
                ));
            }
        }
        StoreError::Sqlx(err)
    }
}

#[async_trait]
impl AdminStore for PgAdminStore {
    async fn find_admin(&self, selector: &AdminSelector) -> Result<Option<Admin>, StoreError> {
        let admin = match selector {
            AdminSelector::Id(id) => {
                sqlx::query_as::<_, Admin>("SELECT * FROM panel_admins WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            AdminSelector::LoginName(login_name) => {
                sqlx::query_as::<_, Admin>(
                    "SELECT * FROM panel_admins WHERE lower(loginname) = lower($1)",
                )
                .bind(login_name)
                .fetch_optional(&self.pool)
                .await?
            }
        };
        Ok(admin)
    }

    async fn list_admins(&self) -> Result<Vec<Admin>, StoreError> {
        let admins =
            sqlx::query_as::<_, Admin>("SELECT * FROM panel_admins ORDER BY loginname ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(admins)
    }

    async fn login_name_taken(&self, login_name: &str) -> Result<bool, StoreError> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM panel_admins WHERE lower(loginname) = lower($1))
                OR EXISTS(SELECT 1 FROM panel_customers WHERE lower(loginname) = lower($1))
            "#,
        )
        .bind(login_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn insert_admin(&self, admin: NewAdmin) -> Result<Admin, StoreError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let sql = r#"
            INSERT INTO panel_admins (
                id, loginname, name, email, def_language, theme,
                custom_notes, custom_notes_show, password, ip,
                change_serversettings, caneditphpsettings,
                customers_see_all, domains_see_all, tickets_see_all,
                created_at, updated_at,
                customers, domains, subdomains, mailboxes, mail_accounts,
                mail_forwarders, mail_quota, ftp_accounts, tickets,
                databases, disk_space, traffic
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29
            )
        "#;

        let mut query = sqlx::query(sql)
            .bind(id)
            .bind(&admin.login_name)
            .bind(&admin.name)
            .bind(&admin.email)
            .bind(&admin.language)
            .bind(&admin.theme)
            .bind(&admin.custom_notes)
            .bind(admin.custom_notes_show)
            .bind(&admin.password_hash)
            .bind(admin.ip_restriction.to_column())
            .bind(admin.permissions.change_server_settings)
            .bind(admin.permissions.edit_php_settings)
            .bind(admin.permissions.customers_see_all)
            .bind(admin.permissions.domains_see_all)
            .bind(admin.permissions.tickets_see_all)
            .bind(now)
            .bind(now);
        for kind in ResourceKind::ALL {
            query = query.bind(admin.limits.get(kind).to_raw());
        }

        query
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_insert_error(e, &admin.login_name))?;

        self.find_admin(&AdminSelector::Id(id))
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("admin {} after insert", id)))
    }

    async fn update_admin(&self, id: AdminId, changes: AdminChanges) -> Result<Admin, StoreError> {
        let sql = r#"
            UPDATE panel_admins SET
                name = $1, email = $2, def_language = $3, theme = $4,
                custom_notes = $5, custom_notes_show = $6, deactivated = $7,
                password = $8, ip = $9,
                change_serversettings = $10, caneditphpsettings = $11,
                customers_see_all = $12, domains_see_all = $13,
                tickets_see_all = $14, updated_at = $15,
                customers = $16, domains = $17, subdomains = $18,
                mailboxes = $19, mail_accounts = $20, mail_forwarders = $21,
                mail_quota = $22, ftp_accounts = $23, tickets = $24,
                databases = $25, disk_space = $26, traffic = $27
            WHERE id = $28
        "#;

        let mut query = sqlx::query(sql)
            .bind(&changes.name)
            .bind(&changes.email)
            .bind(&changes.language)
            .bind(&changes.theme)
            .bind(&changes.custom_notes)
            .bind(changes.custom_notes_show)
            .bind(changes.deactivated)
            .bind(&changes.password_hash)
            .bind(changes.ip_restriction.to_column())
            .bind(changes.permissions.change_server_settings)
            .bind(changes.permissions.edit_php_settings)
            .bind(changes.permissions.customers_see_all)
            .bind(changes.permissions.domains_see_all)
            .bind(changes.permissions.tickets_see_all)
            .bind(Utc::now());
        for kind in ResourceKind::ALL {
            query = query.bind(changes.limits.get(kind).to_raw());
        }
        let result = query.bind(id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("admin {}", id)));
        }

        self.find_admin(&AdminSelector::Id(id))
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("admin {}", id)))
    }

    async fn reset_failed_logins(&self, id: AdminId) -> Result<Admin, StoreError> {
        let result =
            sqlx::query("UPDATE panel_admins SET loginfail_count = 0, updated_at = $1 WHERE id = $2")
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("admin {}", id)));
        }

        self.find_admin(&AdminSelector::Id(id))
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("admin {}", id)))
    }

    async fn usage_vector(&self, id: AdminId) -> Result<ResourceUsage, StoreError> {
        let row = sqlx::query("SELECT * FROM panel_admins WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("admin {}", id)))?;

        let mut usage = ResourceUsage::default();
        for kind in ResourceKind::ALL {
            let used: i64 = row.try_get(kind.used_column())?;
            usage.set(kind, used);
        }
        Ok(usage)
    }

    async fn adjust_usage(
        &self,
        id: AdminId,
        kind: ResourceKind,
        delta: i64,
        detail_key: Option<&str>,
    ) -> Result<i64, StoreError> {
        let sql = format!(
            "UPDATE panel_admins SET {col} = {col} + $1, updated_at = $2 WHERE id = $3 RETURNING {col}",
            col = kind.used_column()
        );
        let updated: i64 = sqlx::query_scalar(&sql)
            .bind(delta)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("admin {}", id)))?;

        if let Some(detail_key) = detail_key {
            sqlx::query(
                r#"
                INSERT INTO panel_admin_usage_detail (admin_id, kind, detail_key, amount)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (admin_id, kind, detail_key)
                DO UPDATE SET amount = panel_admin_usage_detail.amount + EXCLUDED.amount
                "#,
            )
            .bind(id)
            .bind(kind.as_str())
            .bind(detail_key)
            .bind(delta)
            .execute(&self.pool)
            .await?;
        }

        Ok(updated)
    }

    async fn set_limit(
        &self,
        id: AdminId,
        kind: ResourceKind,
        value: ResourceLimit,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "UPDATE panel_admins SET {col} = $1, updated_at = $2 WHERE id = $3",
            col = kind.as_str()
        );
        let result = sqlx::query(&sql)
            .bind(value.to_raw())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("admin {}", id)));
        }
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn AdminTransaction>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgAdminTransaction { tx }))
    }
}

/// sqlx transaction wrapper; rollback happens on drop.
struct PgAdminTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AdminTransaction for PgAdminTransaction {
    async fn delete_admin_row(&mut self, id: AdminId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM panel_admins WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("admin {}", id)));
        }
        Ok(())
    }

    async fn purge_usage_ledgers(&mut self, id: AdminId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM panel_admin_usage_detail WHERE admin_id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn reassign_customers(&mut self, from: AdminId, to: AdminId) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE panel_customers SET admin_id = $1 WHERE admin_id = $2")
            .bind(to)
            .bind(from)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn reassign_domains(&mut self, from: AdminId, to: AdminId) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE panel_domains SET admin_id = $1 WHERE admin_id = $2")
            .bind(to)
            .bind(from)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_admin_api_keys(&mut self, id: AdminId) -> Result<u64, StoreError> {
        let result =
            sqlx::query("DELETE FROM panel_api_keys WHERE admin_id = $1 AND customer_id IS NULL")
                .bind(id)
                .execute(&mut *self.tx)
                .await?;
        Ok(result.rows_affected())
    }

    async fn reassign_api_keys(&mut self, from: AdminId, to: AdminId) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE panel_api_keys SET admin_id = $1 WHERE admin_id = $2")
            .bind(to)
            .bind(from)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
