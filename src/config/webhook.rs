//! Operator webhook configuration

use serde::Deserialize;
use std::time::Duration;

use secrecy::SecretString;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookSettings {
    pub url: Option<String>,

    /// HMAC-SHA256 key for the `X-Join-Signature` header
    pub signing_secret: Option<SecretString>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl WebhookSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let url = self
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(ValidationError::MissingRequired("WEBHOOK__URL"))?;
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(ValidationError::InvalidUrl("WEBHOOK__URL"));
        }
        Ok(())
    }
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            url: None,
            signing_secret: None,
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_required() {
        assert_eq!(
            WebhookSettings::default().validate(),
            Err(ValidationError::MissingRequired("WEBHOOK__URL"))
        );
    }

    #[test]
    fn test_url_scheme_checked() {
        let settings = WebhookSettings {
            url: Some("ftp://hooks.example.org".to_string()),
            ..Default::default()
        };
        assert_eq!(
            settings.validate(),
            Err(ValidationError::InvalidUrl("WEBHOOK__URL"))
        );
    }
}
