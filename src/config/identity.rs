//! Identity provider configuration (Auth0)

use serde::Deserialize;
use std::time::Duration;

use secrecy::SecretString;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Tenant domain, e.g. `acme.eu.auth0.com`
    pub auth0_domain: Option<String>,

    /// Machine-to-machine application used for the management API
    pub auth0_client_id: Option<String>,

    pub auth0_client_secret: Option<SecretString>,

    /// Database connection new users are created in
    #[serde(default = "default_connection")]
    pub auth0_connection: String,

    /// Role ids assigned to every new member (comma-separated)
    pub auth0_default_roles: Option<String>,

    /// Overrides `https://<domain>`
    pub base_url: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl IdentityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn default_roles(&self) -> Vec<String> {
        split_list(self.auth0_default_roles.as_deref())
    }

    /// Validate identity configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.auth0_domain.as_deref().map_or(true, str::is_empty) {
            return Err(ValidationError::MissingRequired("AUTH0_DOMAIN"));
        }
        if self.auth0_client_id.as_deref().map_or(true, str::is_empty) {
            return Err(ValidationError::MissingRequired("AUTH0_CLIENT_ID"));
        }
        if self.auth0_client_secret.is_none() {
            return Err(ValidationError::MissingRequired("AUTH0_CLIENT_SECRET"));
        }
        Ok(())
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            auth0_domain: None,
            auth0_client_id: None,
            auth0_client_secret: None,
            auth0_connection: default_connection(),
            auth0_default_roles: None,
            base_url: None,
            timeout_secs: default_timeout(),
        }
    }
}

pub(super) fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|s| {
            s.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn default_connection() -> String {
    "Username-Password-Authentication".to_string()
}

fn default_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_domain() {
        assert_eq!(
            IdentityConfig::default().validate(),
            Err(ValidationError::MissingRequired("AUTH0_DOMAIN"))
        );
    }

    #[test]
    fn test_roles_parsing() {
        let config = IdentityConfig {
            auth0_default_roles: Some("rol_member, rol_voter".to_string()),
            ..Default::default()
        };
        assert_eq!(config.default_roles(), vec!["rol_member", "rol_voter"]);
    }

    #[test]
    fn test_complete_config_is_valid() {
        let config = IdentityConfig {
            auth0_domain: Some("acme.eu.auth0.com".to_string()),
            auth0_client_id: Some("client".to_string()),
            auth0_client_secret: Some(SecretString::new("secret".to_string())),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
