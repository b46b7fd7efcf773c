//! Billing configuration (Chargebee or Stripe) and the plan catalogue

use std::collections::HashSet;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::join::{DonationItems, MembershipPlan, PlanCatalog};

use super::error::ValidationError;

/// Which billing provider the pipeline uses.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BillingBackend {
    /// Billing steps are skipped entirely.
    #[default]
    None,
    /// In-memory provider, for local development.
    Mock,
    Chargebee,
    Stripe,
}

/// Billing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    #[serde(default)]
    pub backend: BillingBackend,

    /// ISO currency code for subscriptions
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Chargebee site name (`<site>.chargebee.com`)
    pub chargebee_site: Option<String>,

    pub chargebee_api_key: Option<SecretString>,

    /// GoCardless gateway account in Chargebee, for direct debit customers
    pub chargebee_gateway_account_id: Option<String>,

    pub stripe_api_key: Option<SecretString>,

    /// Overrides the provider API URL
    pub base_url: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Membership plans offered by the join form
    #[serde(default)]
    pub plans: Vec<MembershipPlan>,

    #[serde(default)]
    pub donation: DonationItems,
}

impl BillingConfig {
    pub fn is_enabled(&self) -> bool {
        self.backend != BillingBackend::None
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn catalog(&self) -> PlanCatalog {
        PlanCatalog {
            plans: self.plans.clone(),
            donation: self.donation.clone(),
        }
    }

    /// Validate billing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.is_enabled() {
            return Ok(());
        }

        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency);
        }

        match self.backend {
            BillingBackend::Chargebee => {
                if self.chargebee_site.as_deref().map_or(true, str::is_empty) {
                    return Err(ValidationError::MissingRequired("CHARGEBEE_SITE"));
                }
                if self.chargebee_api_key.is_none() {
                    return Err(ValidationError::MissingRequired("CHARGEBEE_API_KEY"));
                }
            }
            BillingBackend::Stripe => {
                let key = self
                    .stripe_api_key
                    .as_ref()
                    .ok_or(ValidationError::MissingRequired("STRIPE_API_KEY"))?;
                if !key.expose_secret().starts_with("sk_") {
                    return Err(ValidationError::InvalidStripeKey);
                }
            }
            BillingBackend::Mock | BillingBackend::None => {}
        }

        if let Some(url) = &self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidUrl("BILLING_BASE_URL"));
            }
        }

        self.validate_plans()
    }

    fn validate_plans(&self) -> Result<(), ValidationError> {
        if self.plans.is_empty() {
            return Err(ValidationError::NoPlansConfigured);
        }
        let mut seen = HashSet::new();
        for plan in &self.plans {
            if plan.id.is_empty() || plan.item_price_id.is_empty() {
                return Err(ValidationError::InvalidPlan(
                    "plan id and item_price_id are required".to_string(),
                ));
            }
            if !seen.insert(plan.id.as_str()) {
                return Err(ValidationError::InvalidPlan(format!("duplicate plan {}", plan.id)));
            }
            if plan.unit_amount <= 0 {
                return Err(ValidationError::InvalidPlan(format!(
                    "{} must have a positive unit_amount",
                    plan.id
                )));
            }
            if let Some(suggested) = &plan.suggested {
                if suggested.base_unit_amount <= 0
                    || suggested.base_item_price_id.is_empty()
                    || suggested.add_on_item_price_id.is_empty()
                {
                    return Err(ValidationError::InvalidPlan(format!(
                        "{} has an incomplete suggested contribution",
                        plan.id
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            backend: BillingBackend::None,
            currency: default_currency(),
            chargebee_site: None,
            chargebee_api_key: None,
            chargebee_gateway_account_id: None,
            stripe_api_key: None,
            base_url: None,
            timeout_secs: default_timeout(),
            plans: Vec::new(),
            donation: DonationItems::default(),
        }
    }
}

fn default_currency() -> String {
    "GBP".to_string()
}

fn default_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chargebee() -> BillingConfig {
        serde_json::from_value(json!({
            "backend": "chargebee",
            "chargebee_site": "acme-test",
            "chargebee_api_key": "test_key",
            "plans": [
                {
                    "id": "standard",
                    "item_price_id": "membership-standard-GBP-monthly",
                    "unit_amount": 500
                }
            ],
            "donation": {
                "one_off_item_price_id": "donation-GBP"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_disabled_billing_skips_validation() {
        assert!(BillingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_chargebee_config_is_valid() {
        let config = chargebee();
        assert!(config.validate().is_ok());
        assert_eq!(config.currency, "GBP");
        assert_eq!(config.catalog().donation.one_off_item_price_id, "donation-GBP");
    }

    #[test]
    fn test_chargebee_requires_site() {
        let config = BillingConfig {
            chargebee_site: None,
            ..chargebee()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("CHARGEBEE_SITE"))
        );
    }

    #[test]
    fn test_stripe_key_prefix_checked() {
        let config = BillingConfig {
            backend: BillingBackend::Stripe,
            stripe_api_key: Some(SecretString::new("pk_test_abc".to_string())),
            ..chargebee()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidStripeKey));
    }

    #[test]
    fn test_enabled_billing_needs_plans() {
        let config = BillingConfig {
            plans: Vec::new(),
            ..chargebee()
        };
        assert_eq!(config.validate(), Err(ValidationError::NoPlansConfigured));
    }

    #[test]
    fn test_duplicate_plan_rejected() {
        let mut config = chargebee();
        config.plans.push(config.plans[0].clone());
        assert!(matches!(config.validate(), Err(ValidationError::InvalidPlan(_))));
    }

    #[test]
    fn test_lowercase_currency_rejected() {
        let config = BillingConfig {
            currency: "gbp".to_string(),
            ..chargebee()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidCurrency));
    }
}
