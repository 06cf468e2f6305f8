//! Authentication errors
//!
//! Rejections render through [`depot_common::Error`], so a missing token
//! and a handler-level denial share one response body.

use axum::response::{IntoResponse, Response};
use depot_common::Error;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header required")]
    MissingAuthorization,

    #[error("Invalid authorization header format")]
    InvalidAuthorizationFormat,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid user ID in token")]
    InvalidUserId,

    #[error("Admin role required")]
    AdminRequired,
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AdminRequired => Error::PermissionDenied(err.to_string()),
            _ => Error::Authentication(err.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        Error::from(self).into_response()
    }
}
