//! Feature flags configuration
//!
//! The billing backend is chosen by `billing.backend`; everything else the
//! pipeline talks to is switched on here.

use serde::Deserialize;

/// Feature flags for enabling/disabling integrations
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FeatureFlags {
    /// Accept direct debit payments through GoCardless
    #[serde(default)]
    pub use_gocardless: bool,

    /// Create an Auth0 account for each new member
    #[serde(default)]
    pub create_auth0_account: bool,

    #[serde(default)]
    pub use_action_network: bool,

    #[serde(default)]
    pub use_mailchimp: bool,

    #[serde(default)]
    pub use_zetkin: bool,

    /// Post every successful submission to the operator webhook
    #[serde(default)]
    pub use_webhook: bool,
}
