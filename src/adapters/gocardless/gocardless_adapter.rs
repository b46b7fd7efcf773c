//! GoCardless mandate provider adapter.
//!
//! Creates a customer, a bank account and a Bacs mandate in three calls.
//! Each POST carries an `Idempotency-Key` built from the session token and a
//! digest of the submitted details. GoCardless answers a repeated key with
//! `idempotent_creation_conflict` and the id of the earlier resource, which is
//! then reused. After a bank details validation failure, the corrected
//! resubmission keeps the customer and creates a new bank account.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::ports::{MandateError, MandateProvider, MandateRecord, MandateRequest};

use super::types::{
    BankAccountCreate, BankAccountEnvelope, BankAccountLinks, CustomerCreate, CustomerEnvelope,
    CustomersPage, GcErrorEnvelope, MandateCreate, MandateCreateLinks, MandateEnvelope,
    MandatesPage,
};

const API_VERSION: &str = "2015-07-06";

#[derive(Clone)]
pub struct GoCardlessConfig {
    access_token: SecretString,
    api_base_url: String,
    timeout: Duration,
}

impl GoCardlessConfig {
    /// `sandbox` selects the sandbox API host.
    pub fn new(access_token: SecretString, sandbox: bool) -> Self {
        let api_base_url = if sandbox {
            "https://api-sandbox.gocardless.com"
        } else {
            "https://api.gocardless.com"
        };
        Self {
            access_token,
            api_base_url: api_base_url.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct GoCardlessMandateAdapter {
    config: GoCardlessConfig,
    http_client: reqwest::Client,
}

impl GoCardlessMandateAdapter {
    pub fn new(config: GoCardlessConfig) -> Self {
        let http_client = crate::adapters::http_client(config.timeout);
        Self {
            config,
            http_client,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, format!("{}{}", self.config.api_base_url, path))
            .bearer_auth(self.config.access_token.expose_secret())
            .header("GoCardless-Version", API_VERSION)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, MandateError> {
        let response = self
            .request(reqwest::Method::GET, path)
            .query(query)
            .send()
            .await
            .map_err(|e| MandateError::Network(e.to_string()))?;
        parse_response(response, path).await
    }

    async fn create<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        idempotency_key: &str,
    ) -> Result<Created<T>, MandateError> {
        let response = self
            .request(reqwest::Method::POST, path)
            .header("Idempotency-Key", idempotency_key)
            .json(body)
            .send()
            .await
            .map_err(|e| MandateError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            let body = response.text().await.unwrap_or_default();
            let existing = serde_json::from_str::<GcErrorEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error.conflicting_resource_id().map(str::to_string));
            return match existing {
                Some(id) => {
                    tracing::info!(
                        provider = "gocardless",
                        path = %path,
                        resource_id = %id,
                        "Reusing resource from an earlier attempt"
                    );
                    Ok(Created::Existing(id))
                }
                None => {
                    tracing::error!(provider = "gocardless", path = %path, body = %body, "GoCardless request failed");
                    Err(error_from_body(409, &body))
                }
            };
        }
        parse_response(response, path).await.map(Created::New)
    }
}

/// Outcome of an idempotent create.
enum Created<T> {
    New(T),
    Existing(String),
}

async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
    path: &str,
) -> Result<T, MandateError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!(
            provider = "gocardless",
            status = status.as_u16(),
            path = %path,
            body = %body,
            "GoCardless request failed"
        );
        return Err(error_from_body(status.as_u16(), &body));
    }
    response
        .json()
        .await
        .map_err(|e| MandateError::Provider(format!("Failed to parse GoCardless response: {}", e)))
}

fn error_from_body(status: u16, body: &str) -> MandateError {
    let Ok(envelope) = serde_json::from_str::<GcErrorEnvelope>(body) else {
        return MandateError::Provider(format!("GoCardless returned {}: {}", status, body));
    };
    let error = envelope.error;
    match error.error_type.as_str() {
        "validation_failed" => MandateError::ValidationFailed {
            fields: error.errors.into_iter().filter_map(|e| e.field).collect(),
            message: error.message,
        },
        "invalid_api_usage" => MandateError::InvalidApiUsage(error.message),
        "invalid_state" => MandateError::InvalidState(error.message),
        _ => MandateError::Provider(error.message),
    }
}

#[async_trait]
impl MandateProvider for GoCardlessMandateAdapter {
    fn name(&self) -> &'static str {
        "gocardless"
    }

    async fn find_recent_mandate(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<MandateRecord>, MandateError> {
        let page: CustomersPage = self
            .get(
                "/customers",
                &[
                    (
                        "created_at[gte]",
                        since.to_rfc3339_opts(SecondsFormat::Secs, true),
                    ),
                    ("limit", "500".to_string()),
                ],
            )
            .await?;

        // The customers endpoint cannot filter by email.
        let matching = page.customers.into_iter().filter(|c| {
            c.created_at >= since
                && c.email
                    .as_deref()
                    .map(|e| e.eq_ignore_ascii_case(email))
                    .unwrap_or(false)
        });

        for customer in matching {
            let mandates: MandatesPage = self
                .get("/mandates", &[("customer", customer.id.clone())])
                .await?;
            if let Some(mandate) = mandates.mandates.into_iter().find(|m| m.is_reusable()) {
                tracing::info!(
                    provider = "gocardless",
                    mandate_id = %mandate.id,
                    customer_id = %customer.id,
                    "Reusing recent mandate"
                );
                return Ok(Some(MandateRecord {
                    id: mandate.id,
                    reference: mandate.reference,
                    customer_id: mandate.links.customer,
                }));
            }
        }
        Ok(None)
    }

    async fn create_mandate(&self, request: MandateRequest) -> Result<MandateRecord, MandateError> {
        let session = request.session_token.as_str();

        let customer_key = format!(
            "{}-customer-{}",
            session,
            crate::adapters::short_digest([
                request.email.as_str(),
                request.given_name.as_str(),
                request.family_name.as_str(),
                request.address_line1.as_str(),
                request.city.as_str(),
                request.postal_code.as_str(),
                request.country_code.as_str(),
            ])
        );
        let customer_id = match self
            .create::<_, CustomerEnvelope>(
                "/customers",
                &serde_json::json!({
                    "customers": CustomerCreate {
                        email: &request.email,
                        given_name: &request.given_name,
                        family_name: &request.family_name,
                        address_line1: &request.address_line1,
                        city: &request.city,
                        postal_code: &request.postal_code,
                        country_code: &request.country_code,
                        metadata: HashMap::from([("session_token", session)]),
                    }
                }),
                &customer_key,
            )
            .await?
        {
            Created::New(envelope) => envelope.customers.id,
            Created::Existing(id) => id,
        };

        let bank_key = format!(
            "{}-bank-account-{}",
            session,
            crate::adapters::short_digest([
                customer_id.as_str(),
                request.account_holder_name.as_str(),
                request.account_number.as_str(),
                request.branch_code.as_str(),
            ])
        );
        let bank_account_id = match self
            .create::<_, BankAccountEnvelope>(
                "/customer_bank_accounts",
                &serde_json::json!({
                    "customer_bank_accounts": BankAccountCreate {
                        account_holder_name: &request.account_holder_name,
                        account_number: &request.account_number,
                        branch_code: &request.branch_code,
                        country_code: &request.country_code,
                        links: BankAccountLinks { customer: &customer_id },
                    }
                }),
                &bank_key,
            )
            .await?
        {
            Created::New(envelope) => envelope.customer_bank_accounts.id,
            Created::Existing(id) => id,
        };

        let mandate = match self
            .create::<_, MandateEnvelope>(
                "/mandates",
                &serde_json::json!({
                    "mandates": MandateCreate {
                        scheme: "bacs",
                        links: MandateCreateLinks {
                            customer_bank_account: &bank_account_id,
                        },
                    }
                }),
                &format!("{}-mandate-{}", session, bank_account_id),
            )
            .await?
        {
            Created::New(envelope) => envelope.mandates,
            Created::Existing(id) => {
                let envelope: MandateEnvelope =
                    self.get(&format!("/mandates/{}", id), &[]).await?;
                envelope.mandates
            }
        };
        tracing::info!(
            provider = "gocardless",
            mandate_id = %mandate.id,
            customer_id = %customer_id,
            "Mandate created"
        );

        Ok(MandateRecord {
            id: mandate.id,
            reference: mandate.reference,
            customer_id,
        })
    }
}
