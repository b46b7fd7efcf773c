//! Zetkin organisation signup.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::join::JoinRequest;
use crate::ports::{SignupAdapter, SignupError};

#[derive(Clone)]
pub struct ZetkinConfig {
    pub access_token: SecretString,
    pub base_url: String,
    pub organization_id: String,
    /// Tag ids applied to the new person.
    pub tag_ids: Vec<u64>,
    pub blocking: bool,
    pub timeout: Duration,
}

impl ZetkinConfig {
    pub fn new(access_token: SecretString, organization_id: impl Into<String>) -> Self {
        Self {
            access_token,
            base_url: "https://api.zetk.in".to_string(),
            organization_id: organization_id.into(),
            tag_ids: Vec::new(),
            blocking: false,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct NewPerson<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    street_address: &'a str,
    zip_code: &'a str,
    city: &'a str,
    country: &'a str,
}

#[derive(Debug, Deserialize)]
struct PersonEnvelope {
    data: ZetkinPerson,
}

#[derive(Debug, Deserialize)]
struct ZetkinPerson {
    id: u64,
}

pub struct ZetkinSignup {
    config: ZetkinConfig,
    http_client: reqwest::Client,
}

impl ZetkinSignup {
    pub fn new(config: ZetkinConfig) -> Self {
        let http_client = crate::adapters::http_client(config.timeout);
        Self {
            config,
            http_client,
        }
    }

    fn org_url(&self, path: &str) -> String {
        format!(
            "{}/v1/orgs/{}{}",
            self.config.base_url, self.config.organization_id, path
        )
    }
}

#[async_trait]
impl SignupAdapter for ZetkinSignup {
    fn name(&self) -> &'static str {
        "zetkin"
    }

    fn is_blocking(&self) -> bool {
        self.config.blocking
    }

    async fn signup(&self, request: &JoinRequest) -> Result<(), SignupError> {
        let email = request.normalized_email();
        let body = NewPerson {
            first_name: request.first_name.trim(),
            last_name: request.last_name.trim(),
            email: &email,
            phone: request.phone_number.as_deref().filter(|p| !p.trim().is_empty()),
            street_address: &request.address_line1,
            zip_code: &request.address_postcode,
            city: &request.address_city,
            country: &request.address_country,
        };

        let response = self
            .http_client
            .post(self.org_url("/people"))
            .bearer_auth(self.config.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| SignupError::Network(e.to_string()))?;
        let response = super::check_response(response).await?;
        let person: PersonEnvelope = response
            .json()
            .await
            .map_err(|e| SignupError::Network(e.to_string()))?;

        for tag_id in &self.config.tag_ids {
            let response = self
                .http_client
                .put(self.org_url(&format!("/people/{}/tags/{}", person.data.id, tag_id)))
                .bearer_auth(self.config.access_token.expose_secret())
                .send()
                .await
                .map_err(|e| SignupError::Network(e.to_string()))?;
            super::check_status(response).await?;
        }
        Ok(())
    }
}
