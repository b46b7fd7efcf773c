//! GoCardless API request and response types.
//!
//! Every GoCardless payload wraps the resource in a key named after the
//! resource type (`{"customers": {...}}`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct CustomerCreate<'a> {
    pub email: &'a str,
    pub given_name: &'a str,
    pub family_name: &'a str,
    pub address_line1: &'a str,
    pub city: &'a str,
    pub postal_code: &'a str,
    pub country_code: &'a str,
    pub metadata: HashMap<&'static str, &'a str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BankAccountCreate<'a> {
    pub account_holder_name: &'a str,
    pub account_number: &'a str,
    pub branch_code: &'a str,
    pub country_code: &'a str,
    pub links: BankAccountLinks<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BankAccountLinks<'a> {
    pub customer: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct MandateCreate<'a> {
    pub scheme: &'static str,
    pub links: MandateCreateLinks<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MandateCreateLinks<'a> {
    pub customer_bank_account: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcBankAccount {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcMandate {
    pub id: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    pub links: GcMandateLinks,
}

impl GcMandate {
    /// Mandates that can still collect payments.
    pub fn is_reusable(&self) -> bool {
        matches!(
            self.status.as_deref(),
            Some("pending_customer_approval" | "pending_submission" | "submitted" | "active")
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcMandateLinks {
    pub customer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomersPage {
    pub customers: Vec<GcCustomer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MandatesPage {
    pub mandates: Vec<GcMandate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerEnvelope {
    pub customers: GcCustomer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BankAccountEnvelope {
    pub customer_bank_accounts: GcBankAccount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MandateEnvelope {
    pub mandates: GcMandate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcErrorEnvelope {
    pub error: GcError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcError {
    #[serde(rename = "type")]
    pub error_type: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<GcFieldError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcFieldError {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub links: Option<GcErrorLinks>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcErrorLinks {
    #[serde(default)]
    pub conflicting_resource_id: Option<String>,
}

impl GcError {
    /// Id of the resource an earlier request with the same idempotency key
    /// already created.
    pub fn conflicting_resource_id(&self) -> Option<&str> {
        self.errors
            .iter()
            .filter(|e| e.reason.as_deref() == Some("idempotent_creation_conflict"))
            .find_map(|e| e.links.as_ref()?.conflicting_resource_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_validation_error() {
        let json = r#"{"error":{
            "type":"validation_failed",
            "code":422,
            "message":"Validation failed",
            "errors":[{"field":"branch_code","message":"is invalid","request_pointer":"/customer_bank_accounts/branch_code"}]
        }}"#;
        let envelope: GcErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.error.error_type, "validation_failed");
        assert_eq!(envelope.error.errors[0].field.as_deref(), Some("branch_code"));
    }

    #[test]
    fn finds_conflicting_resource() {
        let json = r#"{"error":{
            "type":"invalid_state",
            "code":409,
            "message":"A resource has already been created with this idempotency key",
            "errors":[{"reason":"idempotent_creation_conflict","message":"A resource has already been created with this idempotency key","links":{"conflicting_resource_id":"CU123"}}]
        }}"#;
        let envelope: GcErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.error.conflicting_resource_id(), Some("CU123"));
    }

    #[test]
    fn only_live_mandates_are_reusable() {
        let mandate = |status: &str| GcMandate {
            id: "MD1".to_string(),
            reference: None,
            status: Some(status.to_string()),
            links: GcMandateLinks {
                customer: "CU1".to_string(),
            },
        };
        assert!(mandate("pending_submission").is_reusable());
        assert!(mandate("active").is_reusable());
        assert!(!mandate("cancelled").is_reusable());
        assert!(!mandate("failed").is_reusable());
    }

    #[test]
    fn serializes_bank_account_links() {
        let body = BankAccountCreate {
            account_holder_name: "A Person",
            account_number: "55779911",
            branch_code: "200000",
            country_code: "GB",
            links: BankAccountLinks { customer: "CU1" },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["links"]["customer"], "CU1");
    }
}
