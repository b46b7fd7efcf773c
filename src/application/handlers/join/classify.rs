//! Port errors into the client-facing `JoinError` taxonomy.
//!
//! Raw provider detail stays inside the `JoinError` variants that carry it and
//! is never part of `user_message()`.

use crate::domain::join::{
    classify_billing_failure, classify_mandate_failure, InvalidTransition, JoinError,
    MandateFailureType,
};
use crate::ports::{
    BillingError, BillingErrorCode, IdentityError, LockError, MandateError, WebhookError,
};

impl From<BillingError> for JoinError {
    fn from(err: BillingError) -> Self {
        match err.code {
            BillingErrorCode::HostedPageFailed => JoinError::HostedPageFailure {
                detail: err.message,
            },
            BillingErrorCode::NetworkError => JoinError::unknown(err.message),
            BillingErrorCode::PaymentFailed
            | BillingErrorCode::InvalidRequest
            | BillingErrorCode::ProviderError => {
                classify_billing_failure(err.provider_code.as_deref(), &err.message)
            }
        }
    }
}

impl From<MandateError> for JoinError {
    fn from(err: MandateError) -> Self {
        match err {
            MandateError::ValidationFailed { message, fields } => {
                classify_mandate_failure(MandateFailureType::ValidationFailed, fields, &message)
            }
            MandateError::InvalidApiUsage(message) => {
                classify_mandate_failure(MandateFailureType::InvalidApiUsage, Vec::new(), &message)
            }
            MandateError::InvalidState(message) => {
                classify_mandate_failure(MandateFailureType::InvalidState, Vec::new(), &message)
            }
            MandateError::Network(message) | MandateError::Provider(message) => {
                classify_mandate_failure(MandateFailureType::Other, Vec::new(), &message)
            }
        }
    }
}

impl From<IdentityError> for JoinError {
    fn from(err: IdentityError) -> Self {
        JoinError::IdentityProvisioningFailure {
            detail: err.to_string(),
        }
    }
}

impl From<WebhookError> for JoinError {
    fn from(err: WebhookError) -> Self {
        JoinError::WebhookDeliveryFailure {
            detail: err.to_string(),
        }
    }
}

impl From<LockError> for JoinError {
    fn from(_: LockError) -> Self {
        JoinError::LockUnavailable
    }
}

impl From<InvalidTransition> for JoinError {
    fn from(err: InvalidTransition) -> Self {
        JoinError::unknown(err.to_string())
    }
}
