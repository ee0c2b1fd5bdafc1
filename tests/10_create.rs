mod common;

use anyhow::Result;

use panel_admin_api::auth::AdminSession;
use panel_admin_api::config::FeatureToggles;
use panel_admin_api::database::store::AdminStore;
use panel_admin_api::error::AdminError;
use panel_admin_api::resources::{ResourceKind, ResourceLimit, ResourceLimitPatch};
use panel_admin_api::services::CreateAdmin;

use common::{by_id, by_login, TestContext};

#[tokio::test]
async fn created_admin_is_retrievable_by_id_and_login() -> Result<()> {
    let ctx = TestContext::new().await?;

    let created = ctx.create_admin("alice").await?;

    let by_id_result = ctx.service.get(&ctx.root_session(), &by_id(&created)).await?;
    let by_login_result = ctx.service.get(&ctx.root_session(), &by_login("alice")).await?;
    assert_eq!(by_id_result.id, created.id);
    assert_eq!(by_login_result.id, created.id);
    assert_eq!(created.theme, "Sparkle");
    assert_eq!(created.language, "en");
    assert!(!created.deactivated);
    assert_eq!(created.failed_logins, 0);
    Ok(())
}

#[tokio::test]
async fn created_admin_starts_with_a_zeroed_usage_vector() -> Result<()> {
    let ctx = TestContext::new().await?;

    let created = ctx.create_admin("alice").await?;
    let usage = ctx.store.usage_vector(created.id).await?;
    assert!(usage.is_zeroed());
    Ok(())
}

#[tokio::test]
async fn password_is_stored_hashed_and_generated_when_absent() -> Result<()> {
    let ctx = TestContext::new().await?;

    let with_password = ctx
        .service
        .create(
            &ctx.root_session(),
            CreateAdmin {
                login_name: "alice".to_string(),
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                password: Some("plaintext-secret".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert!(with_password.password_hash.starts_with("sha256$"));
    assert!(!with_password.password_hash.contains("plaintext-secret"));

    // no password supplied: one is generated, the hash is still opaque
    let generated = ctx.create_admin("bob").await?;
    assert!(generated.password_hash.starts_with("sha256$"));
    Ok(())
}

#[tokio::test]
async fn disk_and_traffic_limits_convert_to_storage_units() -> Result<()> {
    let ctx = TestContext::new().await?;

    let created = ctx
        .service
        .create(
            &ctx.root_session(),
            CreateAdmin {
                login_name: "alice".to_string(),
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                limits: ResourceLimitPatch::default()
                    .with(ResourceKind::Customers, ResourceLimit::Limited(5))
                    .with(ResourceKind::DiskSpace, ResourceLimit::Limited(1024))
                    .with(ResourceKind::Traffic, ResourceLimit::Limited(2)),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(
        created.limits.get(ResourceKind::Customers),
        ResourceLimit::Limited(5)
    );
    // 1024 MiB -> KiB
    assert_eq!(
        created.limits.get(ResourceKind::DiskSpace),
        ResourceLimit::Limited(1024 * 1024)
    );
    // 2 GiB -> KiB
    assert_eq!(
        created.limits.get(ResourceKind::Traffic),
        ResourceLimit::Limited(2 * 1024 * 1024)
    );
    Ok(())
}

#[tokio::test]
async fn feature_gated_limits_are_forced_to_unlimited() -> Result<()> {
    let ctx = TestContext::with_features(FeatureToggles {
        mail_quota_enabled: false,
        ticketing_enabled: false,
    })
    .await?;

    let created = ctx
        .service
        .create(
            &ctx.root_session(),
            CreateAdmin {
                login_name: "alice".to_string(),
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                limits: ResourceLimitPatch::default()
                    .with(ResourceKind::Tickets, ResourceLimit::Limited(10))
                    .with(ResourceKind::MailQuota, ResourceLimit::Limited(100)),
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(
        created.limits.get(ResourceKind::Tickets),
        ResourceLimit::Unlimited
    );
    assert_eq!(
        created.limits.get(ResourceKind::MailQuota),
        ResourceLimit::Unlimited
    );
    Ok(())
}

#[tokio::test]
async fn duplicate_login_names_are_rejected_across_namespaces() -> Result<()> {
    let ctx = TestContext::new().await?;

    ctx.create_admin("alice").await?;
    let duplicate = ctx.create_admin("alice").await;
    assert!(matches!(
        duplicate,
        Err(ref e) if matches!(e.downcast_ref::<AdminError>(), Some(AdminError::Validation { field: "login_name", .. }))
    ));

    // collision with a customer login, case-insensitively
    ctx.store.add_customer(ctx.root.id, "Bob").await;
    let collision = ctx.create_admin("bob").await;
    assert!(matches!(
        collision,
        Err(ref e) if matches!(e.downcast_ref::<AdminError>(), Some(AdminError::Validation { field: "login_name", .. }))
    ));

    // only root and alice exist
    let admins = ctx.service.list(&ctx.root_session()).await?;
    assert_eq!(admins.len(), 2);
    Ok(())
}

#[tokio::test]
async fn reserved_and_malformed_login_names_are_rejected() -> Result<()> {
    let ctx = TestContext::new().await?;

    for bad in ["", "web1", "Alice", "1alice"] {
        let result = ctx.create_admin(bad).await;
        assert!(
            matches!(
                result,
                Err(ref e) if matches!(e.downcast_ref::<AdminError>(), Some(AdminError::Validation { field: "login_name", .. }))
            ),
            "'{}' should be rejected",
            bad
        );
    }
    Ok(())
}

#[tokio::test]
async fn create_requires_the_server_settings_capability() -> Result<()> {
    let ctx = TestContext::new().await?;

    let powerless = AdminSession::new(ctx.root.id);
    let result = ctx
        .service
        .create(
            &powerless,
            CreateAdmin {
                login_name: "alice".to_string(),
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(AdminError::Unauthorized)));

    let admins = ctx.service.list(&ctx.root_session()).await?;
    assert_eq!(admins.len(), 1, "no row may be created");
    Ok(())
}

#[tokio::test]
async fn list_is_ordered_by_login_name() -> Result<()> {
    let ctx = TestContext::new().await?;

    ctx.create_admin("zoe").await?;
    ctx.create_admin("alice").await?;

    let admins = ctx.service.list(&ctx.root_session()).await?;
    let logins: Vec<&str> = admins.iter().map(|a| a.login_name.as_str()).collect();
    assert_eq!(logins, vec!["alice", "root", "zoe"]);
    Ok(())
}
