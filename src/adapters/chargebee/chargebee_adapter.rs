//! Chargebee billing provider adapter.
//!
//! Implements `BillingProvider` against the Chargebee v2 REST API using the
//! item-based product catalogue. Requests are form encoded and authenticated
//! with the site API key as the basic auth username.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::domain::join::{BillingAddress, LineItemKind};
use crate::ports::{
    BillingError, BillingProvider, CustomerRecord, NewCustomer, NewSubscription, PaymentSource,
    SubscriptionRecord, SubscriptionStatus,
};

use super::types::{
    ChargebeeErrorBody, ChargebeeList, ChargebeeSubscription, CustomerEntry, HostedPageEnvelope,
    SubscriptionEntry,
};

/// Chargebee API configuration.
#[derive(Clone)]
pub struct ChargebeeConfig {
    api_key: SecretString,
    api_base_url: String,
    /// Gateway account the direct debit mandates belong to.
    gateway_account_id: Option<String>,
    timeout: Duration,
}

impl ChargebeeConfig {
    pub fn new(site: &str, api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: format!("https://{}.chargebee.com/api/v2", site),
            gateway_account_id: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_gateway_account(mut self, gateway_account_id: Option<String>) -> Self {
        self.gateway_account_id = gateway_account_id;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct ChargebeeBillingAdapter {
    config: ChargebeeConfig,
    http_client: reqwest::Client,
}

impl ChargebeeBillingAdapter {
    pub fn new(config: ChargebeeConfig) -> Self {
        let http_client = crate::adapters::http_client(config.timeout);
        Self {
            config,
            http_client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, BillingError> {
        let response = self
            .http_client
            .get(self.url(path))
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
    ) -> Result<T, BillingError> {
        let response = self
            .http_client
            .post(self.url(path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(params)
            .send()
            .await
            .map_err(|e| BillingError::network(e.to_string()))?;
        parse_response(response, path).await
    }

    /// The customer a completed hosted checkout created.
    async fn customer_from_hosted_page(
        &self,
        hosted_page_id: &str,
    ) -> Result<CustomerRecord, BillingError> {
        let path = format!("/hosted_pages/{}", urlencoding::encode(hosted_page_id));
        let envelope: HostedPageEnvelope = self.get(&path, &[]).await.map_err(|e| {
            BillingError::hosted_page(format!("hosted page {} unavailable: {}", hosted_page_id, e))
        })?;

        let page = envelope.hosted_page;
        if page.state != "succeeded" {
            return Err(BillingError::hosted_page(format!(
                "hosted page {} is in state {}",
                page.id, page.state
            )));
        }
        let customer = page
            .content
            .and_then(|c| c.customer)
            .ok_or_else(|| BillingError::hosted_page("hosted page has no customer"))?;

        Ok(CustomerRecord {
            email: customer.email.unwrap_or_default(),
            id: customer.id,
        })
    }
}

async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
    path: &str,
) -> Result<T, BillingError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!(
            provider = "chargebee",
            status = status.as_u16(),
            path = %path,
            body = %body,
            "Chargebee request failed"
        );
        return Err(error_from_body(status.as_u16(), &body));
    }
    response.json().await.map_err(|e| {
        BillingError::provider(format!("Failed to parse Chargebee response: {}", e))
    })
}

/// Maps a Chargebee error body onto a `BillingError`, keeping the raw text.
fn error_from_body(status: u16, body: &str) -> BillingError {
    let parsed: ChargebeeErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = if parsed.message.is_empty() {
        format!("Chargebee returned {}", status)
    } else {
        parsed.message.clone()
    };

    let error = match parsed.error_type.as_deref() {
        Some("payment") => BillingError::payment(message),
        Some("invalid_request") => BillingError::invalid_request(message),
        _ if status == 404 => BillingError::invalid_request(message),
        _ => BillingError::provider(message),
    };

    match parsed.error_code.or(parsed.api_error_code) {
        Some(code) => error.with_provider_code(code),
        None => error,
    }
}

fn billing_address_params(address: &BillingAddress) -> Vec<(String, String)> {
    let mut params = vec![
        ("billing_address[first_name]".to_string(), address.first_name.clone()),
        ("billing_address[last_name]".to_string(), address.last_name.clone()),
        ("billing_address[line1]".to_string(), address.line1.clone()),
        ("billing_address[city]".to_string(), address.city.clone()),
        ("billing_address[zip]".to_string(), address.zip.clone()),
        ("billing_address[country]".to_string(), address.country.clone()),
    ];
    if let Some(line2) = &address.line2 {
        params.push(("billing_address[line2]".to_string(), line2.clone()));
    }
    if let Some(state) = &address.state {
        params.push(("billing_address[state]".to_string(), state.clone()));
    }
    params
}

fn item_type(kind: LineItemKind) -> &'static str {
    match kind {
        LineItemKind::Plan => "plan",
        LineItemKind::AddOn => "addon",
        LineItemKind::OneOffCharge => "charge",
    }
}

fn subscription_item_params(request: &NewSubscription) -> Vec<(String, String)> {
    let mut params = Vec::new();
    for (i, item) in request.line_items.iter().enumerate() {
        params.push((
            format!("subscription_items[item_price_id][{}]", i),
            item.item_price_id.clone(),
        ));
        params.push((
            format!("subscription_items[item_type][{}]", i),
            item_type(item.kind).to_string(),
        ));
        params.push((
            format!("subscription_items[quantity][{}]", i),
            item.quantity.to_string(),
        ));
        // Plan prices come from the catalogue; add-ons and charges carry the chosen amount.
        if item.kind != LineItemKind::Plan {
            params.push((
                format!("subscription_items[unit_price][{}]", i),
                item.unit_amount.value().to_string(),
            ));
        }
    }
    params
}

#[async_trait]
impl BillingProvider for ChargebeeBillingAdapter {
    fn name(&self) -> &'static str {
        "chargebee"
    }

    async fn find_customers_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<CustomerRecord>, BillingError> {
        let list: ChargebeeList<CustomerEntry> = self
            .get(
                "/customers",
                &[("email[is]", email.to_string()), ("limit", "100".to_string())],
            )
            .await?;

        Ok(list
            .list
            .into_iter()
            .map(|entry| CustomerRecord {
                email: entry.customer.email.unwrap_or_else(|| email.to_string()),
                id: entry.customer.id,
            })
            .collect())
    }

    async fn has_active_membership_subscription(
        &self,
        customer_id: &str,
        plan_ids: &[String],
    ) -> Result<bool, BillingError> {
        let list: ChargebeeList<SubscriptionEntry> = self
            .get(
                "/subscriptions",
                &[
                    ("customer_id[is]", customer_id.to_string()),
                    ("limit", "100".to_string()),
                ],
            )
            .await?;

        Ok(list.list.iter().any(|entry| {
            let sub: &ChargebeeSubscription = &entry.subscription;
            SubscriptionStatus::from_provider(&sub.status).is_active() && sub.has_plan_in(plan_ids)
        }))
    }

    async fn create_customer(&self, request: NewCustomer) -> Result<CustomerRecord, BillingError> {
        let mut params = vec![
            ("email".to_string(), request.email.clone()),
            ("first_name".to_string(), request.first_name.clone()),
            ("last_name".to_string(), request.last_name.clone()),
            ("auto_collection".to_string(), "on".to_string()),
            (
                "meta_data".to_string(),
                serde_json::json!({ "session_token": request.session_token }).to_string(),
            ),
        ];
        if let Some(phone) = &request.phone {
            params.push(("phone".to_string(), phone.clone()));
        }
        params.extend(billing_address_params(&request.billing_address));

        match &request.payment_source {
            PaymentSource::HostedPage(id) => return self.customer_from_hosted_page(id).await,
            PaymentSource::CardToken(token) => {
                params.push(("token_id".to_string(), token.clone()));
            }
            PaymentSource::DirectDebitMandate { mandate_id } => {
                params.push(("payment_method[type]".to_string(), "direct_debit".to_string()));
                params.push(("payment_method[reference_id]".to_string(), mandate_id.clone()));
                if let Some(gateway) = &self.config.gateway_account_id {
                    params.push(("payment_method[gateway_account_id]".to_string(), gateway.clone()));
                }
            }
        }

        let entry: CustomerEntry = self.post("/customers", &params).await?;
        tracing::info!(provider = "chargebee", customer_id = %entry.customer.id, "Customer created");

        Ok(CustomerRecord {
            email: entry.customer.email.unwrap_or(request.email),
            id: entry.customer.id,
        })
    }

    async fn create_subscription(
        &self,
        request: NewSubscription,
    ) -> Result<SubscriptionRecord, BillingError> {
        let path = format!("/customers/{}/subscription_for_items", request.customer_id);
        let entry: SubscriptionEntry = self.post(&path, &subscription_item_params(&request)).await?;
        let sub = entry.subscription;
        tracing::info!(
            provider = "chargebee",
            subscription_id = %sub.id,
            customer_id = %sub.customer_id,
            "Subscription created"
        );

        Ok(SubscriptionRecord {
            status: SubscriptionStatus::from_provider(&sub.status),
            id: sub.id,
            customer_id: sub.customer_id,
            plan_id: request.plan_id,
            line_items: request.line_items,
        })
    }
}
