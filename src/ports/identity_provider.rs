//! Identity provider port for member account provisioning.
//!
//! The identity provider is not the source of truth for membership (billing
//! is), so accounts are looked up by email rather than by any stored id.
//!
//! # Contract
//!
//! Implementations must:
//! - Return `Ok(true)` from `user_exists` for any account with that email
//! - Create accounts with the given password, metadata and default roles
//! - Return `IdentityError::CredentialsUnavailable` if no service token could be obtained

use async_trait::async_trait;
use secrecy::SecretString;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn user_exists(&self, email: &str) -> Result<bool, IdentityError>;

    /// Creates the account and returns the provider's user id.
    async fn create_user(&self, account: NewIdentityAccount) -> Result<String, IdentityError>;
}

/// Account to provision for a new member.
#[derive(Debug, Clone)]
pub struct NewIdentityAccount {
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    pub password: SecretString,
    pub plan_id: String,
    pub billing_customer_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("could not obtain service credentials: {0}")]
    CredentialsUnavailable(String),

    #[error("identity provider rejected request: {0}")]
    Rejected(String),

    #[error("identity provider unavailable: {0}")]
    ServiceUnavailable(String),
}
