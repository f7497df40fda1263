//! Errors surfaced by the authentication service
//!
//! Every failure is converted into one of these variants at the boundary of
//! the component that owns it, and each variant knows its HTTP shape.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::DatabaseError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{authz::DENIED_MESSAGE, login::Rejection, session::SessionError};

#[derive(Error, Debug)]
pub enum AuthError {
    /// Malformed login form
    #[error("Validation error: {0}")]
    Validation(String),

    /// Locked, unknown, disabled or wrong password
    #[error("Login rejected: {}", .0.message())]
    Rejected(Rejection),

    /// The credential store could not serve a request that has no fallback
    #[error("Credential store unavailable: {0}")]
    StoreUnavailable(#[from] DatabaseError),

    /// Denied by the role authorization gate
    #[error("Forbidden")]
    Forbidden,

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AuthError::Rejected(rejection) => (StatusCode::UNAUTHORIZED, rejection.message()),
            AuthError::StoreUnavailable(e) => {
                error!("Credential store unavailable: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable, please try again".to_string(),
                )
            }
            AuthError::Forbidden => return (StatusCode::FORBIDDEN, DENIED_MESSAGE).into_response(),
            AuthError::Session(e) => {
                error!("Failed to issue session: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for handler results
pub type AuthResult<T> = Result<T, AuthError>;
