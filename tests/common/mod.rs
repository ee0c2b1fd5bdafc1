#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;

use panel_admin_api::auth::AdminSession;
use panel_admin_api::config::FeatureToggles;
use panel_admin_api::credentials::Sha256Hasher;
use panel_admin_api::database::models::{Admin, AdminPermissions, IpRestriction, NewAdmin};
use panel_admin_api::database::store::{AdminSelector, AdminStore};
use panel_admin_api::resources::ResourceLimits;
use panel_admin_api::services::{AdminService, CreateAdmin};
use panel_admin_api::testing::{MemoryStore, RecordingAuditSink};

/// Lifecycle wired against the in-memory store, with a pre-seeded root
/// admin holding the server-settings capability.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub service: AdminService,
    pub audit: Arc<RecordingAuditSink>,
    pub root: Admin,
}

impl TestContext {
    /// Both feature toggles on, so no limit gets forced to unlimited
    /// behind the test's back.
    pub async fn new() -> Result<Self> {
        Self::with_features(FeatureToggles {
            mail_quota_enabled: true,
            ticketing_enabled: true,
        })
        .await
    }

    pub async fn with_features(features: FeatureToggles) -> Result<Self> {
        init_tracing();

        let store = Arc::new(MemoryStore::new());
        let audit = Arc::new(RecordingAuditSink::new());
        let service = AdminService::new(
            store.clone(),
            Arc::new(Sha256Hasher),
            Arc::new(features),
            audit.clone(),
        );

        // seed the root admin straight through the store, the way an
        // installer would
        let root = store
            .insert_admin(NewAdmin {
                login_name: "root".to_string(),
                name: "Root Admin".to_string(),
                email: "root@example.com".to_string(),
                language: "en".to_string(),
                theme: "Sparkle".to_string(),
                custom_notes: String::new(),
                custom_notes_show: false,
                password_hash: "sha256$seed$root".to_string(),
                ip_restriction: IpRestriction::Unrestricted,
                permissions: AdminPermissions {
                    change_server_settings: true,
                    edit_php_settings: true,
                    customers_see_all: true,
                    domains_see_all: true,
                    tickets_see_all: true,
                },
                limits: ResourceLimits::default(),
            })
            .await?;

        Ok(Self {
            store,
            service,
            audit,
            root,
        })
    }

    /// Session carrying the root admin's full capability set.
    pub fn root_session(&self) -> AdminSession {
        self.root.session()
    }

    /// Create a plain admin (no capabilities) through the service.
    pub async fn create_admin(&self, login_name: &str) -> Result<Admin> {
        let admin = self
            .service
            .create(
                &self.root_session(),
                CreateAdmin {
                    login_name: login_name.to_string(),
                    name: format!("Admin {}", login_name),
                    email: format!("{}@example.com", login_name),
                    ..Default::default()
                },
            )
            .await?;
        Ok(admin)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

pub fn by_id(admin: &Admin) -> AdminSelector {
    AdminSelector::Id(admin.id)
}

pub fn by_login(login_name: &str) -> AdminSelector {
    AdminSelector::LoginName(login_name.to_string())
}
