//! Billing provider port for customer and subscription creation.
//!
//! Defines the contract for billing backends (Chargebee, Stripe).
//! Implementations translate provider responses and failures into the types
//! below; they never classify failures into the join taxonomy themselves
//! beyond filling in `BillingErrorCode`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::join::{BillingAddress, LineItem};

/// Port for billing provider integrations.
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &'static str;

    /// All customers registered with this email.
    async fn find_customers_by_email(&self, email: &str)
        -> Result<Vec<CustomerRecord>, BillingError>;

    /// Whether the customer has an active subscription on any of `plan_ids`.
    async fn has_active_membership_subscription(
        &self,
        customer_id: &str,
        plan_ids: &[String],
    ) -> Result<bool, BillingError>;

    /// Create a customer with a payment source attached.
    async fn create_customer(&self, request: NewCustomer) -> Result<CustomerRecord, BillingError>;

    /// Create a subscription for an existing customer.
    async fn create_subscription(
        &self,
        request: NewSubscription,
    ) -> Result<SubscriptionRecord, BillingError>;
}

/// Customer in the billing system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Provider's customer ID.
    pub id: String,

    /// Customer email as the provider echoes it.
    pub email: String,
}

/// How the new customer pays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentSource {
    /// One-time token from the client card widget.
    CardToken(String),

    /// Completed hosted checkout page.
    HostedPage(String),

    /// Direct debit mandate created by the mandate provider.
    DirectDebitMandate { mandate_id: String },
}

/// Request to create a customer.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub billing_address: BillingAddress,
    pub payment_source: PaymentSource,
    /// Correlates provider records with the wizard session.
    pub session_token: String,
}

/// Request to create a subscription.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub customer_id: String,
    pub plan_id: String,
    pub line_items: Vec<LineItem>,
    pub currency: String,
}

/// Subscription in the billing system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub id: String,
    pub customer_id: String,
    pub plan_id: String,
    pub status: SubscriptionStatus,
    pub line_items: Vec<LineItem>,
}

/// Subscription status from billing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    InTrial,
    Future,
    NonRenewing,
    Paused,
    Cancelled,
    Unknown,
}

impl SubscriptionStatus {
    /// Statuses that count as a live membership.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active
                | SubscriptionStatus::InTrial
                | SubscriptionStatus::Future
                | SubscriptionStatus::NonRenewing
        )
    }

    pub fn from_provider(status: &str) -> Self {
        match status {
            "active" => SubscriptionStatus::Active,
            "in_trial" | "trialing" => SubscriptionStatus::InTrial,
            "future" => SubscriptionStatus::Future,
            "non_renewing" => SubscriptionStatus::NonRenewing,
            "paused" => SubscriptionStatus::Paused,
            "cancelled" | "canceled" => SubscriptionStatus::Cancelled,
            _ => SubscriptionStatus::Unknown,
        }
    }
}

/// Errors from billing provider operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct BillingError {
    /// Error code for categorization.
    pub code: BillingErrorCode,

    /// Provider message, unmodified.
    pub message: String,

    /// Provider's machine error code (if available).
    pub provider_code: Option<String>,
}

impl BillingError {
    pub fn new(code: BillingErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(BillingErrorCode::NetworkError, message)
    }

    pub fn payment(message: impl Into<String>) -> Self {
        Self::new(BillingErrorCode::PaymentFailed, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(BillingErrorCode::InvalidRequest, message)
    }

    pub fn hosted_page(message: impl Into<String>) -> Self {
        Self::new(BillingErrorCode::HostedPageFailed, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(BillingErrorCode::ProviderError, message)
    }
}

/// Billing error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// Card or payment method was rejected.
    PaymentFailed,

    /// Request rejected (bad or expired token, bad params).
    InvalidRequest,

    /// Hosted checkout page missing, expired or unpaid.
    HostedPageFailed,

    /// Any other provider API error.
    ProviderError,
}

impl std::fmt::Display for BillingErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BillingErrorCode::NetworkError => "network_error",
            BillingErrorCode::PaymentFailed => "payment_failed",
            BillingErrorCode::InvalidRequest => "invalid_request",
            BillingErrorCode::HostedPageFailed => "hosted_page_failed",
            BillingErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
