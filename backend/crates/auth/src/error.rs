//! Auth Error Types
//!
//! Auth-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use platform::password::PasswordHashError;
use thiserror::Error;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password; deliberately indistinguishable
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Session not found or expired
    #[error("Not signed in or session expired")]
    SessionInvalid,

    #[error("Account is suspended")]
    AccountSuspended(Option<String>),

    /// Caller lacks the role or ownership for the action
    #[error("{0}")]
    Forbidden(String),

    #[error("Email is already registered")]
    EmailTaken,

    #[error("User name is already taken")]
    UserNameTaken,

    #[error("User not found")]
    UserNotFound,

    /// Validation failure raised by a value object or entity
    #[error("{0}")]
    Invalid(AppError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session store error: {0}")]
    SessionStore(#[from] redis::RedisError),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] PasswordHashError),

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
            AuthError::InvalidCredentials | AuthError::SessionInvalid => ErrorKind::Unauthorized,
            AuthError::AccountSuspended(_) | AuthError::Forbidden(_) => ErrorKind::Forbidden,
            AuthError::EmailTaken | AuthError::UserNameTaken => ErrorKind::Conflict,
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::Invalid(err) => err.kind(),
            AuthError::SessionStore(_) => ErrorKind::ServiceUnavailable,
            AuthError::Database(_) | AuthError::PasswordHash(_) | AuthError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Convert to AppError. Internal details never reach the client.
    pub fn to_app_error(&self) -> AppError {
        match self {
            AuthError::AccountSuspended(reason) => {
                let err = AppError::forbidden(self.to_string());
                match reason {
                    Some(reason) => err.with_action(format!("Reason: {reason}")),
                    None => err,
                }
            }
            AuthError::Invalid(err) => {
                let copy = AppError::new(err.kind(), err.message().to_string());
                match err.action() {
                    Some(action) => copy.with_action(action.to_string()),
                    None => copy,
                }
            }
            AuthError::SessionInvalid => AppError::unauthorized(self.to_string())
                .with_action("Sign in and try again"),
            AuthError::Database(_) | AuthError::PasswordHash(_) | AuthError::Internal(_) => {
                AppError::internal("Internal server error")
            }
            AuthError::SessionStore(_) => {
                AppError::service_unavailable("Session service unavailable")
            }
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::SessionStore(e) => {
                tracing::error!(error = %e, "Session store error");
            }
            AuthError::PasswordHash(e) => {
                tracing::error!(error = %e, "Password hashing error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            AuthError::AccountSuspended(_) => {
                tracing::warn!("Login attempt on suspended account");
            }
            AuthError::Forbidden(msg) => {
                tracing::warn!(message = %msg, "Forbidden auth action");
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

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        if err.is_server_error() {
            AuthError::Internal(err.to_string())
        } else {
            AuthError::Invalid(err)
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        err.log();
        err.to_app_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suspended_carries_reason_as_action() {
        let err = AuthError::AccountSuspended(Some("Fraudulent listings".into())).to_app_error();
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.action(), Some("Reason: Fraudulent listings"));
    }

    #[test]
    fn validation_errors_keep_their_kind() {
        let err: AuthError = AppError::bad_request("Invalid email address").into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_app_error().message(), "Invalid email address");
    }

    #[test]
    fn internal_details_are_hidden() {
        let err = AuthError::Internal("pool exploded".into()).to_app_error();
        assert_eq!(err.status_code(), 500);
        assert!(!err.message().contains("pool"));
    }

    #[test]
    fn conflicts() {
        assert_eq!(AuthError::EmailTaken.status_code(), StatusCode::CONFLICT);
        assert_eq!(AuthError::UserNameTaken.status_code(), StatusCode::CONFLICT);
    }
}
