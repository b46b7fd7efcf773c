//! Chargebee billing provider adapter.
//!
//! Implements the `BillingProvider` port for Chargebee, including:
//! - Customer lookup and duplicate membership detection
//! - Customer creation from a card token, a hosted page, or a GoCardless mandate
//! - Subscriptions built from plan, add-on and charge items

mod chargebee_adapter;
mod types;

pub use chargebee_adapter::{ChargebeeBillingAdapter, ChargebeeConfig};
pub use types::{ChargebeeCustomer, ChargebeeErrorBody, ChargebeeSubscription};
