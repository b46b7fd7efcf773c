//! The classified error taxonomy returned to join clients.
//!
//! Every provider failure is reduced to one of these kinds before it leaves
//! the application layer. Each kind carries a stable numeric code the client
//! wizard switches on.
//!
//! | Kind | Code |
//! |------|------|
//! | TokenExpired | 1 |
//! | InsufficientFunds | 2 |
//! | MandateValidation | 3 |
//! | ExpiredCard | 4 |
//! | MandateApiMisuse | 5 |
//! | MandateAmbiguousState | 6 |
//! | HostedPageFailure | 9 |
//! | UnknownProviderError | 11 |
//! | Validation | 20 |
//! | DuplicateActiveMembership | 25 |
//! | LockUnavailable | 30 |
//! | IdentityProvisioningFailure | 40 |
//! | WebhookDeliveryFailure | 41 |
//! | SignupFailure | 42 |

use thiserror::Error;

use crate::domain::foundation::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("payment token expired")]
    TokenExpired,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("card expired")]
    ExpiredCard,

    #[error("mandate validation failed for fields: {}", fields.join(", "))]
    MandateValidation { fields: Vec<String> },

    #[error("mandate provider API misused: {detail}")]
    MandateApiMisuse { detail: String },

    #[error("mandate provider in ambiguous state: {detail}")]
    MandateAmbiguousState { detail: String },

    #[error("hosted payment page failed: {detail}")]
    HostedPageFailure { detail: String },

    #[error("email already has an active membership")]
    DuplicateActiveMembership,

    #[error("identity provisioning failed: {detail}")]
    IdentityProvisioningFailure { detail: String },

    #[error("webhook delivery failed: {detail}")]
    WebhookDeliveryFailure { detail: String },

    #[error("signup adapter {adapter} failed: {detail}")]
    SignupFailure { adapter: String, detail: String },

    #[error("session is locked by another submission")]
    LockUnavailable,

    #[error("invalid request: {0}")]
    Validation(ValidationError),

    #[error("unknown provider error: {detail}")]
    UnknownProviderError { detail: String },
}

impl JoinError {
    pub fn unknown(detail: impl Into<String>) -> Self {
        JoinError::UnknownProviderError {
            detail: detail.into(),
        }
    }

    /// Stable numeric code sent to the client as `error_code`.
    pub fn error_code(&self) -> u16 {
        match self {
            JoinError::TokenExpired => 1,
            JoinError::InsufficientFunds => 2,
            JoinError::MandateValidation { .. } => 3,
            JoinError::ExpiredCard => 4,
            JoinError::MandateApiMisuse { .. } => 5,
            JoinError::MandateAmbiguousState { .. } => 6,
            JoinError::HostedPageFailure { .. } => 9,
            JoinError::UnknownProviderError { .. } => 11,
            JoinError::Validation(_) => 20,
            JoinError::DuplicateActiveMembership => 25,
            JoinError::LockUnavailable => 30,
            JoinError::IdentityProvisioningFailure { .. } => 40,
            JoinError::WebhookDeliveryFailure { .. } => 41,
            JoinError::SignupFailure { .. } => 42,
        }
    }

    /// Message safe to show the applicant. Never includes provider detail.
    pub fn user_message(&self) -> String {
        match self {
            JoinError::TokenExpired => {
                "Your card details timed out. Please re-enter them and try again.".to_string()
            }
            JoinError::InsufficientFunds => {
                "Your card was declined due to insufficient funds.".to_string()
            }
            JoinError::ExpiredCard => "Your card has expired. Please use a different card.".to_string(),
            JoinError::MandateValidation { .. } => {
                "Some of your bank details are invalid. Please check the highlighted fields."
                    .to_string()
            }
            JoinError::MandateApiMisuse { .. } | JoinError::MandateAmbiguousState { .. } => {
                "We couldn't set up your Direct Debit. Please try again later.".to_string()
            }
            JoinError::HostedPageFailure { .. } => {
                "We couldn't complete your card payment. Please try again.".to_string()
            }
            JoinError::DuplicateActiveMembership => {
                "You already have an active membership. You can manage it from your account page."
                    .to_string()
            }
            JoinError::LockUnavailable => {
                "Your application is already being processed. Please wait a moment and try again."
                    .to_string()
            }
            JoinError::Validation(err) => format!("Please check the '{}' field.", err.field()),
            JoinError::IdentityProvisioningFailure { .. }
            | JoinError::WebhookDeliveryFailure { .. }
            | JoinError::SignupFailure { .. }
            | JoinError::UnknownProviderError { .. } => {
                "Something went wrong processing your application. Please try again.".to_string()
            }
        }
    }

    /// Client form fields to highlight, if any.
    pub fn fields(&self) -> Vec<String> {
        match self {
            JoinError::MandateValidation { fields } => fields.clone(),
            JoinError::Validation(err) => vec![err.field().to_string()],
            _ => Vec::new(),
        }
    }

    /// True if a plain resubmission could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            JoinError::TokenExpired
                | JoinError::LockUnavailable
                | JoinError::MandateApiMisuse { .. }
                | JoinError::HostedPageFailure { .. }
                | JoinError::UnknownProviderError { .. }
        )
    }
}

impl From<ValidationError> for JoinError {
    fn from(err: ValidationError) -> Self {
        JoinError::Validation(err)
    }
}
