//! HTTP adapters - REST API implementations.
//!
//! `build_app` wraps the join routes in the tower-http middleware stack.

pub mod join;

pub use join::{join_routes, JoinApiError, JoinAppState, StatusResponse};

use axum::Router;
use http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

/// Build the fully configured application router.
pub fn build_app(state: JoinAppState, server: &ServerConfig) -> Router {
    join_routes()
        // Timeout - innermost, wraps only the handlers
        .layer(TimeoutLayer::new(server.request_timeout()))
        // Trace - request spans at INFO
        .layer(TraceLayer::new_for_http())
        // Propagate request ID to response
        .layer(PropagateRequestIdLayer::x_request_id())
        // Request ID - set before propagation and tracing see the request
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        // CORS - outermost so preflights never reach the handlers
        .layer(cors_layer(&server.cors_origins_list()))
        .with_state(state)
}

/// The join form is embedded on the organisation's own sites.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}
