//! Axum router configuration for the join endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{health, submit_join, JoinAppState};

/// Create the join router.
///
/// # Routes
/// - `POST /join` - submit a membership application
/// - `GET /health` - liveness probe
pub fn join_routes() -> Router<JoinAppState> {
    Router::new()
        .route("/join", post(submit_join))
        .route("/health", get(health))
}
