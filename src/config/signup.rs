//! CRM and mailing list signup configuration
//!
//! Each integration has its own section and its own `blocking` flag. A
//! blocking integration fails the join when its signup fails.

use serde::Deserialize;
use std::time::Duration;

use secrecy::SecretString;

use super::error::ValidationError;
use super::identity::split_list;

#[derive(Debug, Clone, Deserialize)]
pub struct SignupConfig {
    #[serde(default)]
    pub action_network: ActionNetworkSection,

    #[serde(default)]
    pub mailchimp: MailchimpSection,

    #[serde(default)]
    pub zetkin: ZetkinSection,

    /// Applies to every signup request
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl SignupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SignupConfig {
    fn default() -> Self {
        Self {
            action_network: ActionNetworkSection::default(),
            mailchimp: MailchimpSection::default(),
            zetkin: ZetkinSection::default(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionNetworkSection {
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    /// Comma-separated
    pub tags: Option<String>,
    #[serde(default)]
    pub blocking: bool,
}

impl ActionNetworkSection {
    pub fn tags(&self) -> Vec<String> {
        split_list(self.tags.as_deref())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_none() {
            return Err(ValidationError::MissingRequired("ACTION_NETWORK__API_KEY"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailchimpSection {
    /// Key with data centre suffix, e.g. `abc123-us21`
    pub api_key: Option<SecretString>,
    pub list_id: Option<String>,
    pub base_url: Option<String>,
    /// Comma-separated
    pub tags: Option<String>,
    #[serde(default)]
    pub blocking: bool,
}

impl MailchimpSection {
    pub fn tags(&self) -> Vec<String> {
        split_list(self.tags.as_deref())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.api_key.is_none() {
            return Err(ValidationError::MissingRequired("MAILCHIMP__API_KEY"));
        }
        if self.list_id.as_deref().map_or(true, str::is_empty) {
            return Err(ValidationError::MissingRequired("MAILCHIMP__LIST_ID"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZetkinSection {
    pub access_token: Option<SecretString>,
    pub organization_id: Option<String>,
    pub base_url: Option<String>,
    /// Comma-separated numeric tag ids
    pub tag_ids: Option<String>,
    #[serde(default)]
    pub blocking: bool,
}

impl ZetkinSection {
    pub fn tag_ids(&self) -> Result<Vec<u64>, ValidationError> {
        split_list(self.tag_ids.as_deref())
            .iter()
            .map(|id| {
                id.parse::<u64>()
                    .map_err(|_| ValidationError::InvalidValue("ZETKIN__TAG_IDS"))
            })
            .collect()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.access_token.is_none() {
            return Err(ValidationError::MissingRequired("ZETKIN__ACCESS_TOKEN"));
        }
        if self.organization_id.as_deref().map_or(true, str::is_empty) {
            return Err(ValidationError::MissingRequired("ZETKIN__ORGANIZATION_ID"));
        }
        self.tag_ids()?;
        Ok(())
    }
}

fn default_timeout() -> u64 {
    15
}
