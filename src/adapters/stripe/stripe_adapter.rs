//! Stripe billing provider adapter.
//!
//! Implements `BillingProvider` for the Stripe API.
//!
//! Stripe has no direct debit mandates from an external provider and no
//! hosted-page retrieval in this flow, so only card tokens are accepted as a
//! payment source. Plan items use catalogue prices; add-ons and one-off
//! charges are priced inline with `price_data` so the chosen amount is billed.
//!
//! Idempotency keys combine the session token (or customer) with a digest of
//! the request parameters. A network retry of the same request replays
//! Stripe's cached result, while a resubmission with a fresh card token or
//! changed line items is a new request.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key).with_timeout(Duration::from_secs(30));
//! let adapter = StripeBillingAdapter::new(config);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::domain::join::LineItemKind;
use crate::ports::{
    BillingError, BillingProvider, CustomerRecord, NewCustomer, NewSubscription, PaymentSource,
    SubscriptionRecord, SubscriptionStatus,
};

use super::types::{StripeCustomer, StripeErrorEnvelope, StripeList, StripeSubscription};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    timeout: Duration,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: "https://api.stripe.com".to_string(),
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

/// Stripe billing provider adapter.
pub struct StripeBillingAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeBillingAdapter {
    /// Create a new Stripe adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        let http_client = crate::adapters::http_client(config.timeout);
        Self {
            config,
            http_client,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, BillingError> {
        let response = self
            .http_client
            .get(format!("{}{}", self.config.api_base_url, path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .query(query)
            .send()
            .await
            .map_err(|e| BillingError::network(e.to_string()))?;
        parse_response(response, path).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
        idempotency_key: &str,
    ) -> Result<T, BillingError> {
        let response = self
            .http_client
            .post(format!("{}{}", self.config.api_base_url, path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .header("Idempotency-Key", idempotency_key)
            .form(params)
            .send()
            .await
            .map_err(|e| BillingError::network(e.to_string()))?;
        parse_response(response, path).await
    }
}

async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
    path: &str,
) -> Result<T, BillingError> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::error!(
            provider = "stripe",
            status = status.as_u16(),
            path = %path,
            error = %error_text,
            "Stripe request failed"
        );
        return Err(error_from_body(status.as_u16(), &error_text));
    }
    response.json().await.map_err(|e| {
        BillingError::provider(format!("Failed to parse Stripe response: {}", e))
    })
}

fn error_from_body(status: u16, body: &str) -> BillingError {
    let Ok(envelope) = serde_json::from_str::<StripeErrorEnvelope>(body) else {
        return BillingError::provider(format!("Stripe API error ({}): {}", status, body));
    };
    let api = envelope.error;
    let message = api
        .message
        .clone()
        .unwrap_or_else(|| format!("Stripe API error ({})", status));

    let error = match api.error_type.as_str() {
        "card_error" => BillingError::payment(message),
        "invalid_request_error" => BillingError::invalid_request(message),
        _ => BillingError::provider(message),
    };

    // The decline code is more specific than the generic `card_declined`.
    match api.decline_code.or(api.code) {
        Some(code) => error.with_provider_code(code),
        None => error,
    }
}

/// `{scope}-{kind}-{digest}` where the digest covers every form parameter.
fn idempotency_key(scope: &str, kind: &str, params: &[(String, String)]) -> String {
    let digest = crate::adapters::short_digest(
        params
            .iter()
            .flat_map(|(key, value)| [key.as_str(), value.as_str()]),
    );
    format!("{}-{}-{}", scope, kind, digest)
}

fn customer_params(request: &NewCustomer, token: &str) -> Vec<(String, String)> {
    let address = &request.billing_address;
    let mut params = vec![
        ("email".to_string(), request.email.clone()),
        (
            "name".to_string(),
            format!("{} {}", request.first_name, request.last_name),
        ),
        ("source".to_string(), token.to_string()),
        ("address[line1]".to_string(), address.line1.clone()),
        ("address[city]".to_string(), address.city.clone()),
        ("address[postal_code]".to_string(), address.zip.clone()),
        ("address[country]".to_string(), address.country.clone()),
        (
            "metadata[session_token]".to_string(),
            request.session_token.clone(),
        ),
    ];
    if let Some(line2) = &address.line2 {
        params.push(("address[line2]".to_string(), line2.clone()));
    }
    if let Some(state) = &address.state {
        params.push(("address[state]".to_string(), state.clone()));
    }
    if let Some(phone) = &request.phone {
        params.push(("phone".to_string(), phone.clone()));
    }
    params
}

fn subscription_params(request: &NewSubscription) -> Vec<(String, String)> {
    let currency = request.currency.to_lowercase();
    let mut params = vec![("customer".to_string(), request.customer_id.clone())];
    let mut item = 0;
    let mut invoice_item = 0;

    for line in &request.line_items {
        match line.kind {
            LineItemKind::Plan => {
                params.push((format!("items[{}][price]", item), line.item_price_id.clone()));
                params.push((format!("items[{}][quantity]", item), line.quantity.to_string()));
                item += 1;
            }
            LineItemKind::AddOn => {
                let prefix = format!("items[{}][price_data]", item);
                params.push((format!("{}[product]", prefix), line.item_price_id.clone()));
                params.push((format!("{}[currency]", prefix), currency.clone()));
                params.push((
                    format!("{}[unit_amount]", prefix),
                    line.unit_amount.value().to_string(),
                ));
                params.push((format!("{}[recurring][interval]", prefix), "month".to_string()));
                params.push((format!("items[{}][quantity]", item), line.quantity.to_string()));
                item += 1;
            }
            LineItemKind::OneOffCharge => {
                let prefix = format!("add_invoice_items[{}][price_data]", invoice_item);
                params.push((format!("{}[product]", prefix), line.item_price_id.clone()));
                params.push((format!("{}[currency]", prefix), currency.clone()));
                params.push((
                    format!("{}[unit_amount]", prefix),
                    line.unit_amount.value().to_string(),
                ));
                params.push((
                    format!("add_invoice_items[{}][quantity]", invoice_item),
                    line.quantity.to_string(),
                ));
                invoice_item += 1;
            }
        }
    }
    params
}

#[async_trait]
impl BillingProvider for StripeBillingAdapter {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn find_customers_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<CustomerRecord>, BillingError> {
        let list: StripeList<StripeCustomer> = self
            .get(
                "/v1/customers",
                &[("email", email.to_string()), ("limit", "100".to_string())],
            )
            .await?;

        Ok(list
            .data
            .into_iter()
            .filter(|c| !c.deleted)
            .map(|c| CustomerRecord {
                email: c.email.unwrap_or_else(|| email.to_string()),
                id: c.id,
            })
            .collect())
    }

    async fn has_active_membership_subscription(
        &self,
        customer_id: &str,
        plan_ids: &[String],
    ) -> Result<bool, BillingError> {
        let list: StripeList<StripeSubscription> = self
            .get(
                "/v1/subscriptions",
                &[
                    ("customer", customer_id.to_string()),
                    ("status", "all".to_string()),
                    ("limit", "100".to_string()),
                ],
            )
            .await?;

        Ok(list.data.iter().any(|sub| {
            SubscriptionStatus::from_provider(&sub.status).is_active()
                && sub
                    .item_ids()
                    .iter()
                    .any(|id| plan_ids.iter().any(|p| p == id))
        }))
    }

    async fn create_customer(&self, request: NewCustomer) -> Result<CustomerRecord, BillingError> {
        let token = match &request.payment_source {
            PaymentSource::CardToken(token) => token.clone(),
            PaymentSource::HostedPage(_) => {
                return Err(BillingError::hosted_page(
                    "Stripe backend does not support hosted pages",
                ))
            }
            PaymentSource::DirectDebitMandate { .. } => {
                return Err(BillingError::invalid_request(
                    "Stripe backend does not accept external direct debit mandates",
                ))
            }
        };

        let params = customer_params(&request, &token);
        let key = idempotency_key(&request.session_token, "customer", &params);
        let customer: StripeCustomer = self.post("/v1/customers", &params, &key).await?;
        tracing::info!(provider = "stripe", customer_id = %customer.id, "Customer created");

        Ok(CustomerRecord {
            email: customer.email.unwrap_or(request.email),
            id: customer.id,
        })
    }

    async fn create_subscription(
        &self,
        request: NewSubscription,
    ) -> Result<SubscriptionRecord, BillingError> {
        let params = subscription_params(&request);
        let key = idempotency_key(&request.customer_id, "subscription", &params);
        let sub: StripeSubscription = self.post("/v1/subscriptions", &params, &key).await?;
        tracing::info!(
            provider = "stripe",
            subscription_id = %sub.id,
            customer_id = %sub.customer,
            "Subscription created"
        );

        Ok(SubscriptionRecord {
            status: SubscriptionStatus::from_provider(&sub.status),
            id: sub.id,
            customer_id: sub.customer,
            plan_id: request.plan_id,
            line_items: request.line_items,
        })
    }
}
