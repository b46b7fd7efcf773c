//! CRM / mailing list signup port.

use async_trait::async_trait;

use crate::domain::join::JoinRequest;

/// Enrols a new member in a CRM or mailing list.
///
/// Adapters receive the raw submission and pick the fields they need.
#[async_trait]
pub trait SignupAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether a failure of this adapter fails the whole join.
    fn is_blocking(&self) -> bool;

    async fn signup(&self, request: &JoinRequest) -> Result<(), SignupError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignupError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
