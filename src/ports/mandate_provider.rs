//! Mandate provider port for direct debit authorisations.
//!
//! A mandate is created before the paying customer so the billing provider
//! can reference it. The provider is searched first so a resubmitted form
//! reuses the mandate it already created.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Port for direct debit mandate providers.
#[async_trait]
pub trait MandateProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Mandate of a customer with this email created at or after `since`.
    async fn find_recent_mandate(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<MandateRecord>, MandateError>;

    /// Create customer, bank account and mandate.
    async fn create_mandate(&self, request: MandateRequest) -> Result<MandateRecord, MandateError>;
}

/// Bank details and identity needed to set up a mandate.
#[derive(Debug, Clone)]
pub struct MandateRequest {
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    pub address_line1: String,
    pub city: String,
    pub postal_code: String,
    pub country_code: String,
    pub account_holder_name: String,
    pub account_number: String,
    pub branch_code: String,
    pub session_token: String,
}

/// A direct debit authorisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MandateRecord {
    pub id: String,
    /// Reference shown on the payer's bank statement.
    pub reference: Option<String>,
    pub customer_id: String,
}

/// Errors from mandate provider operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MandateError {
    /// Submitted bank details rejected, with the offending fields.
    #[error("validation failed: {message}")]
    ValidationFailed { message: String, fields: Vec<String> },

    /// This service called the API incorrectly.
    #[error("invalid API usage: {0}")]
    InvalidApiUsage(String),

    /// Provider resource in a state that makes the outcome unclear.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("provider error: {0}")]
    Provider(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mandate_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn MandateProvider) {}
    }

    #[test]
    fn validation_error_display() {
        let err = MandateError::ValidationFailed {
            message: "Validation failed".to_string(),
            fields: vec!["account_number".to_string()],
        };
        assert_eq!(err.to_string(), "validation failed: Validation failed");
    }
}
