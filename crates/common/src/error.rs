//! Common error types and handling for Asset Depot
//!
//! The variants mirror the depot error taxonomy: callers can always tell a
//! submit-gate rejection (`FailedPrecondition`) apart from a missing entity
//! or a bad argument, both by HTTP status and by error code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Asset Depot services
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Failed precondition: {reason}")]
    FailedPrecondition {
        reason: String,
        details: serde_json::Value,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a `FailedPrecondition` without structured details
    pub fn precondition(reason: impl Into<String>) -> Self {
        Error::FailedPrecondition {
            reason: reason.into(),
            details: serde_json::Value::Null,
        }
    }

    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Authentication(_) => StatusCode::UNAUTHORIZED,
            Error::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::FailedPrecondition { .. } => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unexpected(_)
            | Error::Database(_)
            | Error::Serialization(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Unexpected(_) => "UNEXPECTED_ERROR",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Authentication(_) => "AUTHENTICATION_ERROR",
            Error::PermissionDenied(_) => "PERMISSION_DENIED",
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::InvalidState(_) => "INVALID_STATE",
            Error::FailedPrecondition { .. } => "FAILED_PRECONDITION",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Log internal errors with full context
        if matches!(status, StatusCode::INTERNAL_SERVER_ERROR) {
            tracing::error!(error = %self, "Internal server error");
        }

        let mut error = json!({
            "code": error_code,
            "message": self.to_string(),
        });
        if let Error::FailedPrecondition { details, .. } = &self {
            if !details.is_null() {
                error["details"] = details.clone();
            }
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}
