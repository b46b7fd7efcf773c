//! In-memory billing provider used by tests and `billing.backend = "mock"`.
//!
//! The real backends live in `adapters::chargebee` and `adapters::stripe`.

mod mock;

pub use mock::{MethodCall, MockBillingProvider};
