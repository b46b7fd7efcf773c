//! Stripe API response types.
//!
//! Only the fields the join pipeline reads are modelled.

use serde::Deserialize;

// ════════════════════════════════════════════════════════════════════════════════
// List Wrapper
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe list response (`object: "list"`).
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

// ════════════════════════════════════════════════════════════════════════════════
// Stripe Objects
// ════════════════════════════════════════════════════════════════════════════════

/// Stripe Customer object.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    /// Unique customer identifier (cus_...).
    pub id: String,

    /// Customer email address.
    pub email: Option<String>,

    /// Whether the customer has been deleted.
    #[serde(default)]
    pub deleted: bool,
}

/// Stripe Subscription object.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    /// Unique subscription identifier (sub_...).
    pub id: String,

    /// Customer ID.
    pub customer: String,

    /// Subscription status (active, past_due, canceled, trialing, ...).
    pub status: String,

    #[serde(default)]
    pub items: Option<StripeList<StripeSubscriptionItem>>,
}

impl StripeSubscription {
    /// Product or price ids on this subscription.
    pub fn item_ids(&self) -> Vec<&str> {
        self.items
            .iter()
            .flat_map(|list| list.data.iter())
            .flat_map(|item| [Some(item.price.id.as_str()), item.price.product.as_deref()])
            .flatten()
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    pub id: String,
    pub price: StripePrice,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePrice {
    pub id: String,
    #[serde(default)]
    pub product: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorEnvelope {
    pub error: StripeApiError,
}

/// Body of a Stripe error response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeApiError {
    /// card_error, invalid_request_error, api_error, ...
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub code: Option<String>,
    /// Issuer decline reason for card errors (e.g. insufficient_funds).
    #[serde(default)]
    pub decline_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
}
