//! GoCardless direct debit mandate adapter.
//!
//! - `GoCardlessMandateAdapter` - customer, bank account and Bacs mandate via the REST API
//! - `MockMandateProvider` - in-memory provider for tests

mod gocardless_adapter;
mod mock;
mod types;

pub use gocardless_adapter::{GoCardlessConfig, GoCardlessMandateAdapter};
pub use mock::MockMandateProvider;
