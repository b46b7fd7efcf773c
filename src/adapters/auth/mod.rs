//! Identity provider adapters.
//!
//! Implementations of the `IdentityProvider` port:
//!
//! - `auth0` - Auth0 management API
//! - `mock` - Test implementation that doesn't require external services

mod auth0;
mod mock;

pub use auth0::{Auth0Config, Auth0IdentityProvider};
pub use mock::{CreatedAccount, MockIdentityProvider};
