//! API error types

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::SupervisorError;
use crate::heartbeat::HeartbeatError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// Unknown identifier.
    NotFound(String),
    /// Identifier already in use.
    Conflict(String),
    /// Termination did not complete within the deadline.
    Timeout(String),
    /// Anything else, including spawn failures.
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// Error response JSON structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error kind.
    pub error: String,
    /// Human-readable detail.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", msg),
            ApiError::Timeout(msg) => (StatusCode::REQUEST_TIMEOUT, "Timeout", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", msg),
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<SupervisorError> for ApiError {
    fn from(err: SupervisorError) -> Self {
        match err {
            SupervisorError::Conflict { .. } => ApiError::Conflict(err.to_string()),
            SupervisorError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            SupervisorError::TerminationPending { .. } => ApiError::Timeout(err.to_string()),
            SupervisorError::SpawnFailed { .. } | SupervisorError::Io(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<HeartbeatError> for ApiError {
    fn from(err: HeartbeatError) -> Self {
        match err {
            HeartbeatError::AlreadyScheduled { .. } => ApiError::Conflict(err.to_string()),
            HeartbeatError::NotScheduled { .. } => ApiError::NotFound(err.to_string()),
        }
    }
}
