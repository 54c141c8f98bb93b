//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::password::PasswordHashError;
use thiserror::Error;

use crate::application::token::TokenError;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password; the two are indistinguishable
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Token could not be signed after a successful password check
    #[error("unable to issue new token for email {email} with err {source}")]
    TokenIssue {
        email: String,
        #[source]
        source: TokenError,
    },

    /// No usable access token on a guarded route
    #[error("{0}")]
    Unauthorized(String),

    /// Access token present but rejected
    #[error("invalid access token: {0}")]
    InvalidToken(#[from] TokenError),

    /// Lookup miss
    #[error("user not found")]
    UserNotFound,

    /// Email already registered
    #[error("email already registered")]
    EmailTaken,

    /// Request body rejected
    #[error("{0}")]
    Validation(String),

    /// Password hashing failed
    #[error("unable to hash password: {0}")]
    Hashing(#[from] PasswordHashError),

    /// Request deadline elapsed before the store answered
    #[error("request timed out")]
    Timeout,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials
            | AuthError::TokenIssue { .. }
            | AuthError::Unauthorized(_)
            | AuthError::InvalidToken(_) => ErrorKind::Unauthorized,
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::EmailTaken => ErrorKind::Conflict,
            AuthError::Validation(_) => ErrorKind::BadRequest,
            AuthError::Timeout => ErrorKind::RequestTimeout,
            AuthError::Database(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed) => {
                ErrorKind::ServiceUnavailable
            }
            AuthError::Hashing(_) | AuthError::Database(_) | AuthError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Convert to AppError
    ///
    /// Server-side faults are reported with a generic message; the detail is
    /// only logged.
    pub fn to_app_error(&self) -> AppError {
        match self.kind() {
            kind if kind.is_server_error() => AppError::new(kind, "internal server error"),
            kind => AppError::new(kind, self.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Hashing(e) => {
                tracing::error!(error = %e, "Password hashing error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::TokenIssue { email, source } => {
                tracing::error!(email = %email, error = %source, "Token issuance failed");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::Timeout => {
                tracing::warn!("Auth request timed out");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}
