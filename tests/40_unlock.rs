mod common;

use anyhow::Result;

use panel_admin_api::audit::AuditSeverity;
use panel_admin_api::error::AdminError;

use common::{by_id, TestContext};

#[tokio::test]
async fn unlock_resets_the_failed_login_counter() -> Result<()> {
    let ctx = TestContext::new().await?;
    let alice = ctx.create_admin("alice").await?;
    ctx.store.set_failed_logins(alice.id, 5).await;

    let unlocked = ctx.service.unlock(&ctx.root_session(), &by_id(&alice)).await?;
    assert_eq!(unlocked.failed_logins, 0);

    // nothing else changed
    assert_eq!(unlocked.name, alice.name);
    assert_eq!(unlocked.limits, alice.limits);
    assert_eq!(unlocked.password_hash, alice.password_hash);
    Ok(())
}

#[tokio::test]
async fn unlock_is_idempotent() -> Result<()> {
    let ctx = TestContext::new().await?;
    let alice = ctx.create_admin("alice").await?;

    let first = ctx.service.unlock(&ctx.root_session(), &by_id(&alice)).await?;
    assert_eq!(first.failed_logins, 0);

    let second = ctx.service.unlock(&ctx.root_session(), &by_id(&alice)).await?;
    assert_eq!(second.failed_logins, 0);
    Ok(())
}

#[tokio::test]
async fn unlock_requires_the_server_settings_capability() -> Result<()> {
    let ctx = TestContext::new().await?;
    let alice = ctx.create_admin("alice").await?;
    ctx.store.set_failed_logins(alice.id, 2).await;

    let result = ctx.service.unlock(&alice.session(), &by_id(&alice)).await;
    assert!(matches!(result, Err(AdminError::Unauthorized)));
    Ok(())
}

#[tokio::test]
async fn unlock_emits_a_warning_audit_record() -> Result<()> {
    let ctx = TestContext::new().await?;
    let alice = ctx.create_admin("alice").await?;

    ctx.service.unlock(&ctx.root_session(), &by_id(&alice)).await?;

    let records = ctx.audit.records();
    let unlock_record = records
        .iter()
        .find(|r| r.action == "admins.unlock")
        .expect("unlock audit record");
    assert_eq!(unlock_record.severity, AuditSeverity::Warning);
    assert!(unlock_record.message.contains("alice"));
    Ok(())
}
