//! Mailchimp audience signup.
//!
//! Members are upserted with `PUT /lists/{list}/members/{hash}` where the hash
//! is the MD5 of the lowercased email, so repeat joins update rather than fail.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::domain::join::JoinRequest;
use crate::ports::{SignupAdapter, SignupError};

#[derive(Clone)]
pub struct MailchimpConfig {
    /// API key; the data centre is the suffix after the last `-`.
    pub api_key: SecretString,
    pub list_id: String,
    pub tags: Vec<String>,
    pub blocking: bool,
    pub timeout: Duration,
    /// Overrides the data-centre URL (for testing).
    pub base_url: Option<String>,
}

impl MailchimpConfig {
    pub fn new(api_key: SecretString, list_id: impl Into<String>) -> Self {
        Self {
            api_key,
            list_id: list_id.into(),
            tags: Vec::new(),
            blocking: false,
            timeout: Duration::from_secs(30),
            base_url: None,
        }
    }

    fn base_url(&self) -> String {
        if let Some(url) = &self.base_url {
            return url.clone();
        }
        let dc = self
            .api_key
            .expose_secret()
            .rsplit_once('-')
            .map(|(_, dc)| dc.to_string())
            .unwrap_or_else(|| "us1".to_string());
        format!("https://{}.api.mailchimp.com/3.0", dc)
    }
}

/// Mailchimp member id for an email.
pub fn subscriber_hash(email: &str) -> String {
    format!("{:x}", md5::compute(email.trim().to_lowercase().as_bytes()))
}

#[derive(Debug, Serialize)]
struct MemberUpsert<'a> {
    email_address: &'a str,
    status_if_new: &'static str,
    merge_fields: MergeFields<'a>,
    tags: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "UPPERCASE")]
struct MergeFields<'a> {
    fname: &'a str,
    lname: &'a str,
}

pub struct MailchimpSignup {
    config: MailchimpConfig,
    http_client: reqwest::Client,
}

impl MailchimpSignup {
    pub fn new(config: MailchimpConfig) -> Self {
        let http_client = crate::adapters::http_client(config.timeout);
        Self {
            config,
            http_client,
        }
    }
}

#[async_trait]
impl SignupAdapter for MailchimpSignup {
    fn name(&self) -> &'static str {
        "mailchimp"
    }

    fn is_blocking(&self) -> bool {
        self.config.blocking
    }

    async fn signup(&self, request: &JoinRequest) -> Result<(), SignupError> {
        let email = request.normalized_email();
        let url = format!(
            "{}/lists/{}/members/{}",
            self.config.base_url(),
            self.config.list_id,
            subscriber_hash(&email)
        );
        let body = MemberUpsert {
            email_address: &email,
            status_if_new: if request.contact_by_email {
                "subscribed"
            } else {
                "transactional"
            },
            merge_fields: MergeFields {
                fname: request.first_name.trim(),
                lname: request.last_name.trim(),
            },
            tags: &self.config.tags,
        };

        let response = self
            .http_client
            .put(url)
            .basic_auth("join-flow", Some(self.config.api_key.expose_secret()))
            .json(&body)
            .send()
            .await
            .map_err(|e| SignupError::Network(e.to_string()))?;

        super::check_status(response).await
    }
}
