//! Strongly-typed identifier value objects.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ValidationError;

/// Client-generated identifier for one wizard session.
///
/// Generated once per form load and kept across steps, so every resubmission
/// of the same form carries the same token. It keys the session lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(Uuid);

impl SessionToken {
    /// Parses a session token from the client's string form.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("sessionToken"));
        }
        Uuid::parse_str(trimmed)
            .map(Self)
            .map_err(|e| ValidationError::invalid_format("sessionToken", e.to_string()))
    }

    /// Creates a new random token (tests and tooling).
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hyphenated_uuid() {
        let token = SessionToken::parse("6f1c7d3e-2b4a-4f1e-9c3d-1a2b3c4d5e6f").unwrap();
        assert_eq!(token.to_string(), "6f1c7d3e-2b4a-4f1e-9c3d-1a2b3c4d5e6f");
    }

    #[test]
    fn rejects_empty_token() {
        let err = SessionToken::parse("  ").unwrap_err();
        assert!(matches!(err, ValidationError::EmptyField { .. }));
    }

    #[test]
    fn rejects_non_uuid_token() {
        let err = SessionToken::parse("not-a-uuid").unwrap_err();
        assert_eq!(err.field(), "sessionToken");
    }
}
