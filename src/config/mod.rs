//! Application configuration module
//!
//! This module provides type-safe configuration loading using the `config`
//! and `dotenvy` crates. Values come from an optional `join-flow.{toml,yaml,json}`
//! file, overridden by environment variables with the `JOIN_FLOW` prefix and
//! `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use join_flow::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod billing;
mod error;
mod features;
mod identity;
mod lock;
mod mandate;
mod server;
mod signup;
mod webhook;

pub use billing::{BillingBackend, BillingConfig};
pub use error::{ConfigError, ValidationError};
pub use features::FeatureFlags;
pub use identity::IdentityConfig;
pub use lock::{LockBackend, LockConfig};
pub use mandate::MandateConfig;
pub use server::{Environment, ServerConfig};
pub use signup::{ActionNetworkSection, MailchimpSection, SignupConfig, ZetkinSection};
pub use webhook::WebhookSettings;

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults so a bare environment starts a server with
/// billing disabled and an in-memory session lock.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Integration switches
    #[serde(default)]
    pub features: FeatureFlags,

    /// Billing backend, credentials and plan catalogue
    #[serde(default)]
    pub billing: BillingConfig,

    /// GoCardless direct debit
    #[serde(default)]
    pub mandate: MandateConfig,

    /// Auth0 account creation
    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub signup: SignupConfig,

    #[serde(default)]
    pub webhook: WebhookSettings,

    #[serde(default)]
    pub lock: LockConfig,
}

impl AppConfig {
    /// Load configuration from the optional file and environment variables
    ///
    /// # Environment Variable Format
    ///
    /// - `JOIN_FLOW__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `JOIN_FLOW__BILLING__CHARGEBEE_SITE=acme` -> `billing.chargebee_site = "acme"`
    /// - `JOIN_FLOW__SIGNUP__MAILCHIMP__LIST_ID=abc` -> `signup.mailchimp.list_id = "abc"`
    ///
    /// Plan definitions are lists and are easiest to keep in the file.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("join-flow").required(false))
            .add_source(
                config::Environment::default()
                    .prefix("JOIN_FLOW")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate every enabled section
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.lock.validate()?;
        self.billing.validate()?;

        if self.features.use_gocardless {
            if self.billing.backend == BillingBackend::Stripe {
                return Err(ValidationError::InvalidValue("FEATURES__USE_GOCARDLESS"));
            }
            self.mandate.validate()?;
        }
        if self.features.create_auth0_account {
            self.identity.validate()?;
        }
        if self.features.use_action_network {
            self.signup.action_network.validate()?;
        }
        if self.features.use_mailchimp {
            self.signup.mailchimp.validate()?;
        }
        if self.features.use_zetkin {
            self.signup.zetkin.validate()?;
        }
        if self.features.use_webhook {
            self.webhook.validate()?;
        }
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "JOIN_FLOW__SERVER__PORT",
        "JOIN_FLOW__SERVER__ENVIRONMENT",
        "JOIN_FLOW__FEATURES__USE_GOCARDLESS",
        "JOIN_FLOW__FEATURES__USE_MAILCHIMP",
        "JOIN_FLOW__MANDATE__GOCARDLESS_ACCESS_TOKEN",
        "JOIN_FLOW__SIGNUP__MAILCHIMP__API_KEY",
        "JOIN_FLOW__SIGNUP__MAILCHIMP__BLOCKING",
        "JOIN_FLOW__LOCK__MAX_WAIT_SECS",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_load_with_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let config = AppConfig::load().unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.billing.backend, BillingBackend::None);
        assert_eq!(config.lock.backend, LockBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_nested_environment_values() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("JOIN_FLOW__SERVER__PORT", "3000");
        env::set_var("JOIN_FLOW__SERVER__ENVIRONMENT", "production");
        env::set_var("JOIN_FLOW__SIGNUP__MAILCHIMP__API_KEY", "abc-us21");
        env::set_var("JOIN_FLOW__SIGNUP__MAILCHIMP__BLOCKING", "true");
        env::set_var("JOIN_FLOW__LOCK__MAX_WAIT_SECS", "3");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.is_production());
        assert!(config.signup.mailchimp.api_key.is_some());
        assert!(config.signup.mailchimp.blocking);
        assert_eq!(config.lock.max_wait_secs, 3);
    }

    #[test]
    fn test_enabled_feature_is_validated() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("JOIN_FLOW__FEATURES__USE_GOCARDLESS", "true");
        let result = AppConfig::load();
        clear_env();

        let config = result.unwrap();
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("GOCARDLESS_ACCESS_TOKEN"))
        );
    }

    #[test]
    fn test_disabled_feature_is_not_validated() {
        let config = AppConfig::default();
        assert!(config.signup.mailchimp.validate().is_err());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_gocardless_needs_chargebee() {
        let mut config = AppConfig::default();
        config.features.use_gocardless = true;
        config.billing.backend = BillingBackend::Stripe;
        assert!(config.validate().is_err());
    }
}
