//! Provider failure classification.
//!
//! Billing providers report card failures as free text, sometimes with a
//! machine code alongside. The rules below are the only place that text is
//! interpreted. Rules run in order and the first match wins; anything
//! unmatched is `UnknownProviderError`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::errors::JoinError;

/// What a billing rule recovers from a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingFailureKind {
    TokenExpired,
    InsufficientFunds,
    ExpiredCard,
}

impl BillingFailureKind {
    fn into_error(self) -> JoinError {
        match self {
            BillingFailureKind::TokenExpired => JoinError::TokenExpired,
            BillingFailureKind::InsufficientFunds => JoinError::InsufficientFunds,
            BillingFailureKind::ExpiredCard => JoinError::ExpiredCard,
        }
    }
}

struct Rule {
    pattern: Regex,
    kind: BillingFailureKind,
}

fn rule(pattern: &str, kind: BillingFailureKind) -> Rule {
    Rule {
        // Patterns are literals in this file; a bad one fails every test.
        pattern: Regex::new(pattern).expect("classification pattern must compile"),
        kind,
    }
}

static BILLING_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        rule(r"(?i)insufficient[_ ]funds", BillingFailureKind::InsufficientFunds),
        rule(
            r"(?i)(expired[_ ]card|card (has )?expired|card[^.]{0,20}expir)",
            BillingFailureKind::ExpiredCard,
        ),
        rule(
            r"(?i)(no such token|token_already_used|temp(orary)?[_ ]token|token[^.]{0,40}(expired|already (been )?used|consumed|no longer valid))",
            BillingFailureKind::TokenExpired,
        ),
    ]
});

/// Classifies a billing failure from its provider code and message.
///
/// The code is checked before the message so a structured code wins over
/// prose that happens to mention another cause.
pub fn classify_billing_failure(provider_code: Option<&str>, message: &str) -> JoinError {
    match_rules(provider_code)
        .or_else(|| match_rules(Some(message)))
        .map(BillingFailureKind::into_error)
        .unwrap_or_else(|| JoinError::unknown(message))
}

fn match_rules(text: Option<&str>) -> Option<BillingFailureKind> {
    let text = text?;
    BILLING_RULES
        .iter()
        .find(|rule| rule.pattern.is_match(text))
        .map(|rule| rule.kind)
}

/// Error categories reported by the mandate provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MandateFailureType {
    ValidationFailed,
    InvalidApiUsage,
    InvalidState,
    Other,
}

impl MandateFailureType {
    /// Parses the provider's `error.type` string.
    pub fn from_provider(error_type: &str) -> Self {
        match error_type {
            "validation_failed" => MandateFailureType::ValidationFailed,
            "invalid_api_usage" => MandateFailureType::InvalidApiUsage,
            "invalid_state" => MandateFailureType::InvalidState,
            _ => MandateFailureType::Other,
        }
    }
}

/// Classifies a mandate failure.
///
/// Only validation failures expose detail (the field names) to the client.
pub fn classify_mandate_failure(
    failure: MandateFailureType,
    fields: Vec<String>,
    message: &str,
) -> JoinError {
    match failure {
        MandateFailureType::ValidationFailed => JoinError::MandateValidation { fields },
        MandateFailureType::InvalidApiUsage => JoinError::MandateApiMisuse {
            detail: message.to_string(),
        },
        MandateFailureType::InvalidState => JoinError::MandateAmbiguousState {
            detail: message.to_string(),
        },
        MandateFailureType::Other => JoinError::unknown(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chargebee_insufficient_funds_message() {
        let err = classify_billing_failure(
            Some("payment_declined"),
            "Insufficient funds in the account. Please use a different card.",
        );
        assert_eq!(err, JoinError::InsufficientFunds);
    }

    #[test]
    fn stripe_decline_code_is_enough() {
        assert_eq!(
            classify_billing_failure(Some("insufficient_funds"), "Your card was declined."),
            JoinError::InsufficientFunds
        );
        assert_eq!(
            classify_billing_failure(Some("expired_card"), "Your card was declined."),
            JoinError::ExpiredCard
        );
    }

    #[test]
    fn expired_card_message() {
        assert_eq!(
            classify_billing_failure(None, "Your card has expired."),
            JoinError::ExpiredCard
        );
    }

    #[test]
    fn expired_token_is_not_unknown() {
        assert_eq!(
            classify_billing_failure(None, "The temp_token tok_abc has expired"),
            JoinError::TokenExpired
        );
        assert_eq!(
            classify_billing_failure(Some("resource_missing"), "No such token: 'tok_abc'"),
            JoinError::TokenExpired
        );
        assert_eq!(
            classify_billing_failure(None, "This payment token has already been used"),
            JoinError::TokenExpired
        );
    }

    #[test]
    fn unrecognised_failure_is_unknown() {
        let err = classify_billing_failure(Some("api_error"), "Something broke upstream");
        assert_eq!(err.error_code(), 11);
    }

    #[test]
    fn mandate_failure_types_parse() {
        assert_eq!(
            MandateFailureType::from_provider("validation_failed"),
            MandateFailureType::ValidationFailed
        );
        assert_eq!(
            MandateFailureType::from_provider("invalid_api_usage"),
            MandateFailureType::InvalidApiUsage
        );
        assert_eq!(
            MandateFailureType::from_provider("invalid_state"),
            MandateFailureType::InvalidState
        );
        assert_eq!(
            MandateFailureType::from_provider("gocardless_error"),
            MandateFailureType::Other
        );
    }

    #[test]
    fn mandate_validation_keeps_fields() {
        let err = classify_mandate_failure(
            MandateFailureType::ValidationFailed,
            vec!["branch_code".to_string()],
            "Validation failed",
        );
        assert_eq!(err.error_code(), 3);
        assert_eq!(err.fields(), vec!["branch_code"]);
    }

    #[test]
    fn mandate_api_misuse_and_state_codes() {
        assert_eq!(
            classify_mandate_failure(MandateFailureType::InvalidApiUsage, vec![], "bad").error_code(),
            5
        );
        assert_eq!(
            classify_mandate_failure(MandateFailureType::InvalidState, vec![], "bad").error_code(),
            6
        );
    }
}
