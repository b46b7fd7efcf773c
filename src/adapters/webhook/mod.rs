//! Operator webhook adapters.

mod http_dispatcher;
mod mock;

pub use http_dispatcher::{sign, HttpWebhookDispatcher, WebhookConfig, SIGNATURE_HEADER};
pub use mock::MockWebhookDispatcher;
