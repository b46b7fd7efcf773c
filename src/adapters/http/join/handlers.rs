//! HTTP handlers for the join endpoints.
//!
//! These handlers connect Axum routes to `SubmitJoinHandler`.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::application::handlers::join::SubmitJoinHandler;
use crate::domain::foundation::ValidationError;
use crate::domain::join::{JoinError, JoinRequest};

use super::dto::StatusResponse;

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for the join routes.
#[derive(Clone)]
pub struct JoinAppState {
    pub submit_join: Arc<SubmitJoinHandler>,
    /// Where members manage an existing membership.
    pub account_url: Option<Arc<str>>,
}

impl JoinAppState {
    pub fn new(submit_join: SubmitJoinHandler) -> Self {
        Self {
            submit_join: Arc::new(submit_join),
            account_url: None,
        }
    }

    pub fn with_account_url(mut self, url: Option<String>) -> Self {
        self.account_url = url.map(Arc::from);
        self
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /join - run a membership application
pub async fn submit_join(
    State(state): State<JoinAppState>,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> Result<impl IntoResponse, JoinApiError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Rejected join body");
        JoinApiError::from(JoinError::from(ValidationError::invalid_format(
            "body",
            rejection.body_text(),
        )))
    })?;

    state.submit_join.handle(request).await.map_err(|err| {
        let link = match err {
            JoinError::DuplicateActiveMembership => state.account_url.as_deref().map(String::from),
            _ => None,
        };
        JoinApiError::from(err).with_link(link)
    })?;
    Ok(Json(StatusResponse::Ok))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(StatusResponse::Ok)
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error wrapper that converts `JoinError` into the error envelope.
#[derive(Debug)]
pub struct JoinApiError {
    pub error: JoinError,
    pub link: Option<String>,
}

impl From<JoinError> for JoinApiError {
    fn from(error: JoinError) -> Self {
        Self { error, link: None }
    }
}

impl JoinApiError {
    pub fn with_link(mut self, link: Option<String>) -> Self {
        self.link = link;
        self
    }

    pub fn status(&self) -> StatusCode {
        match &self.error {
            JoinError::Validation(_) | JoinError::MandateValidation { .. } => {
                StatusCode::BAD_REQUEST
            }
            JoinError::TokenExpired
            | JoinError::InsufficientFunds
            | JoinError::ExpiredCard
            | JoinError::HostedPageFailure { .. } => StatusCode::PAYMENT_REQUIRED,
            JoinError::DuplicateActiveMembership | JoinError::LockUnavailable => {
                StatusCode::CONFLICT
            }
            JoinError::WebhookDeliveryFailure { .. } => StatusCode::BAD_GATEWAY,
            JoinError::MandateApiMisuse { .. }
            | JoinError::MandateAmbiguousState { .. }
            | JoinError::IdentityProvisioningFailure { .. }
            | JoinError::SignupFailure { .. }
            | JoinError::UnknownProviderError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for JoinApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let body = StatusResponse::error(&self.error).with_link(self.link);
        (status, Json(body)).into_response()
    }
}
