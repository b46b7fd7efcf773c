//! Monetary amounts in minor currency units.
//!
//! The client form sends amounts in major units ("10", "12.50"). Providers
//! want integer pence/cents, so conversion happens once here.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Amount in minor currency units (pence, cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinorUnits(i64);

impl MinorUnits {
    pub const ZERO: MinorUnits = MinorUnits(0);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Parses a major-unit decimal string into minor units.
    ///
    /// Blank input is zero. Fractions beyond two places are rounded
    /// half away from zero. Negative amounts are rejected.
    pub fn from_major_str(field: &str, value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(Self::ZERO);
        }

        let major = Decimal::from_str(trimmed)
            .map_err(|e| ValidationError::invalid_format(field, e.to_string()))?;

        if major.is_sign_negative() && !major.is_zero() {
            return Err(ValidationError::invalid_format(field, "amount cannot be negative"));
        }

        major
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|minor| {
                minor
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                    .to_i64()
            })
            .map(Self)
            .ok_or_else(|| ValidationError::invalid_format(field, "amount out of range"))
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Subtracts, clamping at zero.
    pub fn saturating_sub(self, other: MinorUnits) -> MinorUnits {
        MinorUnits((self.0 - other.0).max(0))
    }
}

impl std::fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
