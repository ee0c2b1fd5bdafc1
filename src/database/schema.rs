// Conceptual schema of the panel store. Statements are idempotent so a
// dev or test database can be bootstrapped in place.

use sqlx::PgPool;

use crate::database::store::StoreError;

pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS panel_admins (
        id UUID PRIMARY KEY,
        loginname TEXT NOT NULL,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        def_language TEXT NOT NULL,
        theme TEXT NOT NULL,
        custom_notes TEXT NOT NULL DEFAULT '',
        custom_notes_show BOOLEAN NOT NULL DEFAULT FALSE,
        deactivated BOOLEAN NOT NULL DEFAULT FALSE,
        loginfail_count INTEGER NOT NULL DEFAULT 0,
        password TEXT NOT NULL,
        ip TEXT,
        change_serversettings BOOLEAN NOT NULL DEFAULT FALSE,
        caneditphpsettings BOOLEAN NOT NULL DEFAULT FALSE,
        customers_see_all BOOLEAN NOT NULL DEFAULT FALSE,
        domains_see_all BOOLEAN NOT NULL DEFAULT FALSE,
        tickets_see_all BOOLEAN NOT NULL DEFAULT FALSE,
        customers BIGINT NOT NULL DEFAULT 0,
        customers_used BIGINT NOT NULL DEFAULT 0,
        domains BIGINT NOT NULL DEFAULT 0,
        domains_used BIGINT NOT NULL DEFAULT 0,
        subdomains BIGINT NOT NULL DEFAULT 0,
        subdomains_used BIGINT NOT NULL DEFAULT 0,
        mailboxes BIGINT NOT NULL DEFAULT 0,
        mailboxes_used BIGINT NOT NULL DEFAULT 0,
        mail_accounts BIGINT NOT NULL DEFAULT 0,
        mail_accounts_used BIGINT NOT NULL DEFAULT 0,
        mail_forwarders BIGINT NOT NULL DEFAULT 0,
        mail_forwarders_used BIGINT NOT NULL DEFAULT 0,
        mail_quota BIGINT NOT NULL DEFAULT 0,
        mail_quota_used BIGINT NOT NULL DEFAULT 0,
        ftp_accounts BIGINT NOT NULL DEFAULT 0,
        ftp_accounts_used BIGINT NOT NULL DEFAULT 0,
        tickets BIGINT NOT NULL DEFAULT 0,
        tickets_used BIGINT NOT NULL DEFAULT 0,
        databases BIGINT NOT NULL DEFAULT 0,
        databases_used BIGINT NOT NULL DEFAULT 0,
        disk_space BIGINT NOT NULL DEFAULT 0,
        disk_space_used BIGINT NOT NULL DEFAULT 0,
        traffic BIGINT NOT NULL DEFAULT 0,
        traffic_used BIGINT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS panel_admins_loginname_key
        ON panel_admins (lower(loginname))
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS panel_admin_usage_detail (
        admin_id UUID NOT NULL,
        kind TEXT NOT NULL,
        detail_key TEXT NOT NULL,
        amount BIGINT NOT NULL DEFAULT 0,
        PRIMARY KEY (admin_id, kind, detail_key)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS panel_customers (
        id UUID PRIMARY KEY,
        admin_id UUID NOT NULL,
        loginname TEXT NOT NULL
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS panel_customers_loginname_key
        ON panel_customers (lower(loginname))
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS panel_domains (
        id UUID PRIMARY KEY,
        admin_id UUID NOT NULL,
        domain TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS panel_api_keys (
        id UUID PRIMARY KEY,
        admin_id UUID NOT NULL,
        customer_id UUID
    )
    "#,
];

/// Apply the schema statements one by one.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
