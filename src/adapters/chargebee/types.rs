//! Chargebee API v2 response types.

use serde::Deserialize;

/// Paged list wrapper. Each entry wraps the resource in a named key.
#[derive(Debug, Clone, Deserialize)]
pub struct ChargebeeList<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    #[serde(default)]
    pub next_offset: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerEntry {
    pub customer: ChargebeeCustomer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargebeeCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionEntry {
    pub subscription: ChargebeeSubscription,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargebeeSubscription {
    pub id: String,
    pub customer_id: String,
    pub status: String,
    #[serde(default)]
    pub subscription_items: Vec<ChargebeeSubscriptionItem>,
}

impl ChargebeeSubscription {
    /// Whether any plan item on this subscription is one of `plan_ids`.
    pub fn has_plan_in(&self, plan_ids: &[String]) -> bool {
        self.subscription_items
            .iter()
            .filter(|item| item.item_type.as_deref().unwrap_or("plan") == "plan")
            .any(|item| plan_ids.contains(&item.item_price_id))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargebeeSubscriptionItem {
    pub item_price_id: String,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub unit_price: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostedPageEnvelope {
    pub hosted_page: ChargebeeHostedPage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargebeeHostedPage {
    pub id: String,
    pub state: String,
    #[serde(default)]
    pub content: Option<HostedPageContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostedPageContent {
    #[serde(default)]
    pub customer: Option<ChargebeeCustomer>,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChargebeeErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub api_error_code: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
}
