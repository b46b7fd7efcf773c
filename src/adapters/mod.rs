//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the join pipeline to external systems:
//! - `chargebee`, `stripe` - billing providers (`billing` holds the in-memory mock)
//! - `gocardless` - direct debit mandates
//! - `auth` - identity accounts (Auth0)
//! - `signup` - CRM and mailing list signups
//! - `webhook` - operator webhook delivery
//! - `lock` - per-session locks (in-memory, Redis)
//! - `http` - the axum REST surface

pub mod auth;
pub mod billing;
pub mod chargebee;
pub mod gocardless;
pub mod http;
pub mod lock;
pub mod signup;
pub mod stripe;
pub mod webhook;

use std::time::Duration;

use sha2::{Digest, Sha256};

/// Shared reqwest client construction for every outbound adapter.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default HTTP client");
            reqwest::Client::new()
        })
}

/// First 16 hex chars of SHA-256 over `parts`, for idempotency keys.
pub(crate) fn short_digest<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0x1f]);
    }
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(16);
    digest
}
