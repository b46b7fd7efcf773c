//! Mock identity provider for testing.
//!
//! Implements the `IdentityProvider` port without a real Auth0 tenant.
//!
//! # Example
//!
//! ```ignore
//! let identity = MockIdentityProvider::new().with_existing_user("ada@example.com");
//!
//! assert!(identity.user_exists("ada@example.com").await?);
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{IdentityError, IdentityProvider, NewIdentityAccount};

/// Account the mock created, with the password it was given.
#[derive(Debug, Clone)]
pub struct CreatedAccount {
    pub user_id: String,
    pub email: String,
    pub plan_id: String,
    pub billing_customer_id: Option<String>,
    pub password_len: usize,
}

#[derive(Debug, Default)]
pub struct MockIdentityProvider {
    existing: Mutex<Vec<String>>,
    created: Mutex<Vec<CreatedAccount>>,
    /// Optional error returned by every call (for error testing)
    force_error: Mutex<Option<IdentityError>>,
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account that already exists before the join.
    pub fn with_existing_user(self, email: impl Into<String>) -> Self {
        guard(&self.existing).push(email.into());
        self
    }

    /// Forces all calls to return the specified error.
    pub fn with_error(self, error: IdentityError) -> Self {
        *guard(&self.force_error) = Some(error);
        self
    }

    pub fn created(&self) -> Vec<CreatedAccount> {
        guard(&self.created).clone()
    }

    fn check_error(&self) -> Result<(), IdentityError> {
        match guard(&self.force_error).clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn user_exists(&self, email: &str) -> Result<bool, IdentityError> {
        self.check_error()?;
        let in_existing = guard(&self.existing)
            .iter()
            .any(|e| e.eq_ignore_ascii_case(email));
        let in_created = guard(&self.created)
            .iter()
            .any(|a| a.email.eq_ignore_ascii_case(email));
        Ok(in_existing || in_created)
    }

    async fn create_user(&self, account: NewIdentityAccount) -> Result<String, IdentityError> {
        use secrecy::ExposeSecret;

        self.check_error()?;
        let mut created = guard(&self.created);
        let user_id = format!("mock|{}", created.len() + 1);
        created.push(CreatedAccount {
            user_id: user_id.clone(),
            email: account.email,
            plan_id: account.plan_id,
            billing_customer_id: account.billing_customer_id,
            password_len: account.password.expose_secret().len(),
        });
        Ok(user_id)
    }
}
