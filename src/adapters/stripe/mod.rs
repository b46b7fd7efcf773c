//! Stripe billing provider adapter.
//!
//! Implements the `BillingProvider` port for Stripe integration, including:
//! - Customer lookup and creation from a card token
//! - Active membership detection across subscription items
//! - Subscriptions with inline-priced add-ons and one-off invoice items
//!
//! # Configuration
//!
//! Selected with `billing.backend = "stripe"`; the secret key is read from
//! `JOIN_FLOW__BILLING__STRIPE_API_KEY`.

mod stripe_adapter;
mod types;

pub use stripe_adapter::{StripeBillingAdapter, StripeConfig};
pub use types::{StripeApiError, StripeCustomer, StripeSubscription};
