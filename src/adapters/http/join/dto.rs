//! HTTP DTOs for the join endpoints.
//!
//! The request body is the domain `JoinRequest` itself; only the response
//! envelope lives here.

use serde::Serialize;

use crate::domain::join::JoinError;

/// Response envelope shared by `POST /join` and `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusResponse {
    Ok,
    Error(ErrorBody),
}

/// Error details the wizard switches on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error_code: u16,
    pub message: String,
    /// Form fields to highlight. Empty when the error is not field-specific.
    pub fields: Vec<String>,
    /// Self-service account management, sent with duplicate membership errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl StatusResponse {
    pub fn error(err: &JoinError) -> Self {
        StatusResponse::Error(ErrorBody {
            error_code: err.error_code(),
            message: err.user_message(),
            fields: err.fields(),
            link: None,
        })
    }

    pub fn with_link(mut self, link: Option<String>) -> Self {
        if let StatusResponse::Error(body) = &mut self {
            body.link = link;
        }
        self
    }
}
