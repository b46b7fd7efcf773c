//! Operator webhook over HTTP.
//!
//! Posts the submission as JSON. When a signing secret is configured the body
//! is signed with HMAC-SHA256 and sent as `X-Join-Signature: sha256=<hex>`.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::domain::join::JoinRequest;
use crate::ports::{WebhookDispatcher, WebhookError};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Join-Signature";

#[derive(Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub signing_secret: Option<SecretString>,
    pub timeout: Duration,
}

pub struct HttpWebhookDispatcher {
    config: WebhookConfig,
    http_client: reqwest::Client,
}

impl HttpWebhookDispatcher {
    pub fn new(config: WebhookConfig) -> Self {
        let http_client = crate::adapters::http_client(config.timeout);
        Self {
            config,
            http_client,
        }
    }
}

/// `sha256=<hex>` signature of `body`.
pub fn sign(secret: &SecretString, body: &[u8]) -> Result<String, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| WebhookError::Encoding(e.to_string()))?;
    mac.update(body);
    let digest = mac.finalize().into_bytes();
    Ok(format!("sha256={}", hex::encode(digest)))
}

#[async_trait]
impl WebhookDispatcher for HttpWebhookDispatcher {
    async fn dispatch(&self, request: &JoinRequest) -> Result<(), WebhookError> {
        let body = serde_json::to_vec(request).map_err(|e| WebhookError::Encoding(e.to_string()))?;

        let mut builder = self
            .http_client
            .post(&self.config.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(secret) = &self.config.signing_secret {
            builder = builder.header(SIGNATURE_HEADER, sign(secret, &body)?);
        }

        let response = builder
            .body(body)
            .send()
            .await
            .map_err(|e| WebhookError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %text, "Webhook endpoint rejected submission");
            return Err(WebhookError::Rejected {
                status: status.as_u16(),
            });
        }
        tracing::debug!("Webhook delivered");
        Ok(())
    }
}
