//! Operator webhook port.

use async_trait::async_trait;

use crate::domain::join::JoinRequest;

/// Posts the raw submission to an operator-configured endpoint.
#[async_trait]
pub trait WebhookDispatcher: Send + Sync {
    async fn dispatch(&self, request: &JoinRequest) -> Result<(), WebhookError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("webhook request failed: {0}")]
    Network(String),

    #[error("webhook endpoint returned {status}")]
    Rejected { status: u16 },

    #[error("could not encode submission: {0}")]
    Encoding(String),
}
