//! Direct debit mandate configuration (GoCardless)

use serde::Deserialize;
use std::time::Duration;

use secrecy::SecretString;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct MandateConfig {
    pub gocardless_access_token: Option<SecretString>,

    /// Use the GoCardless sandbox API
    #[serde(default = "default_sandbox")]
    pub sandbox: bool,

    /// Overrides the API URL
    pub base_url: Option<String>,

    /// A mandate created for the same email within this many seconds is reused
    #[serde(default = "default_reuse_window")]
    pub reuse_window_secs: u64,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl MandateConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn reuse_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.reuse_window_secs).unwrap_or(i64::MAX))
    }

    /// Validate mandate configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.gocardless_access_token.is_none() {
            return Err(ValidationError::MissingRequired("GOCARDLESS_ACCESS_TOKEN"));
        }
        if self.reuse_window_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if let Some(url) = &self.base_url {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ValidationError::InvalidUrl("MANDATE_BASE_URL"));
            }
        }
        Ok(())
    }
}

impl Default for MandateConfig {
    fn default() -> Self {
        Self {
            gocardless_access_token: None,
            sandbox: default_sandbox(),
            base_url: None,
            reuse_window_secs: default_reuse_window(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_sandbox() -> bool {
    true
}

fn default_reuse_window() -> u64 {
    300
}

fn default_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MandateConfig::default();
        assert!(config.sandbox);
        assert_eq!(config.reuse_window(), chrono::Duration::minutes(5));
    }

    #[test]
    fn test_token_required() {
        assert_eq!(
            MandateConfig::default().validate(),
            Err(ValidationError::MissingRequired("GOCARDLESS_ACCESS_TOKEN"))
        );
    }

    #[test]
    fn test_valid_with_token() {
        let config = MandateConfig {
            gocardless_access_token: Some(SecretString::new("sandbox_token".to_string())),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
