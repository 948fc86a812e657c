//! Marketplace Error Types
//!
//! Marketplace-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Marketplace-specific result type alias
pub type MarketplaceResult<T> = Result<T, MarketplaceError>;

#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// Malformed or out-of-range input
    #[error("{0}")]
    Validation(String),

    /// The named resource does not exist or is hidden from the caller
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Wrong role or not a party to the resource
    #[error("{0}")]
    Forbidden(String),

    /// Seller actions need a verified identity
    #[error("Identity verification is required for this action")]
    VerificationRequired,

    /// Plan quota exhausted
    #[error("Your plan allows {limit} {what}")]
    LimitReached { what: &'static str, limit: u32 },

    /// The resource is in a state that forbids the action
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MarketplaceError {
    pub fn validation(message: impl Into<String>) -> Self {
        MarketplaceError::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        MarketplaceError::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        MarketplaceError::Conflict(message.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarketplaceError::Validation(_) => ErrorKind::BadRequest,
            MarketplaceError::NotFound(_) => ErrorKind::NotFound,
            MarketplaceError::Forbidden(_) | MarketplaceError::VerificationRequired => {
                ErrorKind::Forbidden
            }
            MarketplaceError::LimitReached { .. } => ErrorKind::PaymentRequired,
            MarketplaceError::Conflict(_) => ErrorKind::Conflict,
            MarketplaceError::Database(_) | MarketplaceError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        match self {
            MarketplaceError::LimitReached { .. } => {
                AppError::payment_required(self.to_string()).with_action("Upgrade your plan")
            }
            MarketplaceError::VerificationRequired => AppError::forbidden(self.to_string())
                .with_action("Ask a moderator to verify your identity"),
            MarketplaceError::Database(_) | MarketplaceError::Internal(_) => {
                AppError::internal("Internal server error")
            }
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            MarketplaceError::Database(e) => {
                tracing::error!(error = %e, "Marketplace database error");
            }
            MarketplaceError::Internal(msg) => {
                tracing::error!(message = %msg, "Marketplace internal error");
            }
            MarketplaceError::Forbidden(msg) => {
                tracing::warn!(message = %msg, "Forbidden marketplace action");
            }
            _ => {
                tracing::debug!(error = %self, "Marketplace error");
            }
        }
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for MarketplaceError {
    fn from(err: AppError) -> Self {
        match err.kind() {
            ErrorKind::BadRequest | ErrorKind::UnprocessableEntity => {
                MarketplaceError::Validation(err.message().to_string())
            }
            _ => MarketplaceError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_reached_is_payment_required() {
        let err = MarketplaceError::LimitReached {
            what: "bids",
            limit: 10,
        };
        assert_eq!(err.status_code(), StatusCode::PAYMENT_REQUIRED);
        let app = err.to_app_error();
        assert_eq!(app.message(), "Your plan allows 10 bids");
        assert_eq!(app.action(), Some("Upgrade your plan"));
    }

    #[test]
    fn statuses() {
        assert_eq!(MarketplaceError::NotFound("Order").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(MarketplaceError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(MarketplaceError::VerificationRequired.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(MarketplaceError::validation("x").status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn database_details_are_hidden() {
        let err = MarketplaceError::Database(sqlx::Error::Protocol("secret dsn".into()));
        let app = err.to_app_error();
        assert_eq!(app.status_code(), 500);
        assert!(!app.message().contains("secret"));
    }
}
