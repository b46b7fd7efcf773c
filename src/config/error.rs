//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid socket address")]
    InvalidSocketAddr,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid URL for {0}")]
    InvalidUrl(&'static str),

    #[error("Invalid value for {0}")]
    InvalidValue(&'static str),

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Currency must be a three letter ISO code")]
    InvalidCurrency,

    #[error("No membership plans configured")]
    NoPlansConfigured,

    #[error("Invalid membership plan: {0}")]
    InvalidPlan(String),

    #[error("Invalid Stripe API key format")]
    InvalidStripeKey,

    #[error("Lock max wait must be shorter than the lock TTL")]
    InvalidLockTimings,
}
