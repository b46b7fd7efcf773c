//! The join submission as the wizard posts it, and its validated form.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::foundation::{MinorUnits, SessionToken, ValidationError};

/// How the applicant pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PaymentMethod {
    CreditCard,
    DirectDebit,
}

/// One membership application exactly as submitted by the client.
///
/// Unknown keys are kept in `extra` so the operator webhook receives the
/// submission unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub dob: Option<String>,

    #[serde(default)]
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    #[serde(default)]
    pub address_city: String,
    #[serde(default)]
    pub address_county: Option<String>,
    #[serde(default)]
    pub address_postcode: String,
    #[serde(default)]
    pub address_country: String,

    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub membership: String,

    #[serde(default, deserialize_with = "string_or_number")]
    pub donation_amount: Option<String>,
    #[serde(default)]
    pub recur_donation: bool,
    #[serde(default, deserialize_with = "string_or_number")]
    pub custom_membership_amount: Option<String>,

    /// One-time token from the client-side card widget.
    #[serde(default)]
    pub payment_token: Option<String>,
    /// Billing provider hosted checkout page, used instead of a token.
    #[serde(default)]
    pub hosted_page_id: Option<String>,

    #[serde(default)]
    pub dd_account_holder_name: Option<String>,
    #[serde(default)]
    pub dd_account_number: Option<String>,
    #[serde(default)]
    pub dd_sort_code: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub custom_fields_values: Map<String, Value>,

    #[serde(default)]
    pub session_token: String,
    #[serde(default)]
    pub webhook_uuid: Option<String>,

    #[serde(default)]
    pub is_update_flow: bool,
    #[serde(default)]
    pub contact_by_email: bool,
    #[serde(default)]
    pub contact_by_phone: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Donation attached to a join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Donation {
    pub amount: MinorUnits,
    pub recurring: bool,
}

/// Values derived from a `JoinRequest` once it has passed entry validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedJoin {
    pub session_token: SessionToken,
    pub donation: Option<Donation>,
    pub custom_membership_amount: Option<MinorUnits>,
}

/// Postal address plus name, as the billing provider wants it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingAddress {
    pub first_name: String,
    pub last_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub zip: String,
    pub country: String,
}

impl JoinRequest {
    /// Validates everything that does not depend on provider configuration.
    pub fn validate(&self) -> Result<ValidatedJoin, ValidationError> {
        require("firstName", &self.first_name)?;
        require("lastName", &self.last_name)?;
        require("email", &self.email)?;
        if !looks_like_email(&self.email) {
            return Err(ValidationError::invalid_format("email", "not an email address"));
        }
        require("membership", &self.membership)?;

        let session_token = SessionToken::parse(&self.session_token)?;

        match self.payment_method {
            PaymentMethod::CreditCard => {
                if blank(&self.payment_token) && blank(&self.hosted_page_id) {
                    return Err(ValidationError::empty_field("paymentToken"));
                }
            }
            PaymentMethod::DirectDebit => {
                require_opt("ddAccountHolderName", &self.dd_account_holder_name)?;
                require_opt("ddAccountNumber", &self.dd_account_number)?;
                require_opt("ddSortCode", &self.dd_sort_code)?;
            }
        }

        let donation = match &self.donation_amount {
            Some(raw) => {
                let amount = MinorUnits::from_major_str("donationAmount", raw)?;
                (!amount.is_zero()).then_some(Donation {
                    amount,
                    recurring: self.recur_donation,
                })
            }
            None => None,
        };

        let custom_membership_amount = match &self.custom_membership_amount {
            Some(raw) if !raw.trim().is_empty() => {
                Some(MinorUnits::from_major_str("customMembershipAmount", raw)?)
            }
            _ => None,
        };

        Ok(ValidatedJoin {
            session_token,
            donation,
            custom_membership_amount,
        })
    }

    /// Normalised email used for every provider lookup.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }

    pub fn billing_address(&self) -> BillingAddress {
        BillingAddress {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            line1: self.address_line1.clone(),
            line2: self.address_line2.clone().filter(|s| !s.trim().is_empty()),
            city: self.address_city.clone(),
            state: self.address_county.clone().filter(|s| !s.trim().is_empty()),
            zip: self.address_postcode.clone(),
            country: self.address_country.clone(),
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::empty_field(field));
    }
    Ok(())
}

fn require_opt(field: &str, value: &Option<String>) -> Result<(), ValidationError> {
    require(field, value.as_deref().unwrap_or(""))
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

/// The wizard sends amounts as strings, older clients as numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Null) | None => None,
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected string or number, got {}",
                other
            )))
        }
    })
}
