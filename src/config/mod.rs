use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

/// Panel-wide settings the lifecycle reads at its boundaries. Defaults
/// mirror a stock installation; every value can be overridden through the
/// environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    pub panel: PanelSettings,
    pub accounts: AccountSettings,
    pub features: FeatureToggles,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelSettings {
    /// Locale assigned to new administrators when the caller supplies none
    pub default_language: String,
    /// UI theme assigned when the caller supplies none
    pub default_theme: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSettings {
    /// Reserved prefix of generated system accounts; a login name matching
    /// `<prefix><digits>` can never be handed out to an administrator.
    pub system_account_prefix: String,
}

/// Global feature toggles that force the corresponding resource limits to
/// unlimited while disabled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeatureToggles {
    pub mail_quota_enabled: bool,
    pub ticketing_enabled: bool,
}

/// Read access to the global feature toggles, injectable for tests.
pub trait FeatureFlags: Send + Sync {
    fn is_mail_quota_enabled(&self) -> bool;
    fn is_ticketing_enabled(&self) -> bool;
}

impl FeatureFlags for FeatureToggles {
    fn is_mail_quota_enabled(&self) -> bool {
        self.mail_quota_enabled
    }

    fn is_ticketing_enabled(&self) -> bool {
        self.ticketing_enabled
    }
}

impl PanelConfig {
    pub fn from_env() -> Self {
        Self::defaults().with_env_overrides()
    }

    fn defaults() -> Self {
        Self {
            panel: PanelSettings {
                default_language: "en".to_string(),
                default_theme: "Sparkle".to_string(),
            },
            accounts: AccountSettings {
                system_account_prefix: "web".to_string(),
            },
            features: FeatureToggles {
                mail_quota_enabled: false,
                ticketing_enabled: true,
            },
        }
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("PANEL_DEFAULT_LANGUAGE") {
            if !v.is_empty() {
                self.panel.default_language = v;
            }
        }
        if let Ok(v) = env::var("PANEL_DEFAULT_THEME") {
            if !v.is_empty() {
                self.panel.default_theme = v;
            }
        }
        if let Ok(v) = env::var("PANEL_ACCOUNT_PREFIX") {
            if !v.is_empty() {
                self.accounts.system_account_prefix = v;
            }
        }
        if let Ok(v) = env::var("PANEL_MAIL_QUOTA_ENABLED") {
            self.features.mail_quota_enabled = v.parse().unwrap_or(self.features.mail_quota_enabled);
        }
        if let Ok(v) = env::var("PANEL_TICKETING_ENABLED") {
            self.features.ticketing_enabled = v.parse().unwrap_or(self.features.ticketing_enabled);
        }
        self
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<PanelConfig> = Lazy::new(PanelConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static PanelConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_defaults() {
        let config = PanelConfig::defaults();
        assert_eq!(config.panel.default_language, "en");
        assert_eq!(config.accounts.system_account_prefix, "web");
        assert!(!config.features.mail_quota_enabled);
        assert!(config.features.ticketing_enabled);
    }

    #[test]
    fn toggles_expose_the_feature_flag_view() {
        let toggles = FeatureToggles {
            mail_quota_enabled: true,
            ticketing_enabled: false,
        };
        assert!(toggles.is_mail_quota_enabled());
        assert!(!toggles.is_ticketing_enabled());
    }
}
