//! HTTP adapter for the join endpoints.
//!
//! - `POST /join` - run a membership application through the pipeline
//! - `GET /health` - liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{ErrorBody, StatusResponse};
pub use handlers::{JoinApiError, JoinAppState};
pub use routes::join_routes;
