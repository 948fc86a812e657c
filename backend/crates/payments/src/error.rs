//! Payment Error Types
//!
//! Payment-specific error variants that integrate with the unified
//! `kernel::error::AppError` system. Initiation endpoints render them as
//! `{success: false, error}`; webhook endpoints never surface them.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use marketplace::MarketplaceError;
use marketplace::models::PaymentProvider;
use serde_json::json;
use thiserror::Error;

/// Payment-specific result type alias
pub type PaymentResult<T> = Result<T, PaymentError>;

#[derive(Debug, Error)]
pub enum PaymentError {
    /// Webhook payload failed authenticity checks
    #[error("Webhook rejected: {0}")]
    InvalidWebhook(String),

    /// Payload or request body is malformed
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    /// The order or plan is in a state that cannot be paid for
    #[error("{0}")]
    Conflict(String),

    #[error("Unknown payment gateway: {0}")]
    UnknownGateway(String),

    /// Credentials for the gateway are missing
    #[error("{0} payments are not configured")]
    NotConfigured(PaymentProvider),

    /// Calling the gateway failed
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error(transparent)]
    Marketplace(#[from] MarketplaceError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PaymentError {
    pub fn validation(message: impl Into<String>) -> Self {
        PaymentError::Validation(message.into())
    }

    pub fn invalid_webhook(reason: impl Into<String>) -> Self {
        PaymentError::InvalidWebhook(reason.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::Marketplace(e) => e.status_code(),
            _ => StatusCode::from_u16(self.kind().status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::InvalidWebhook(_) | PaymentError::Validation(_) => ErrorKind::BadRequest,
            PaymentError::NotFound(_) | PaymentError::UnknownGateway(_) => ErrorKind::NotFound,
            PaymentError::Forbidden(_) => ErrorKind::Forbidden,
            PaymentError::Conflict(_) => ErrorKind::Conflict,
            PaymentError::NotConfigured(_) => ErrorKind::ServiceUnavailable,
            PaymentError::Gateway(_) => ErrorKind::BadGateway,
            PaymentError::Marketplace(e) => e.kind(),
            PaymentError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Message safe to show to the caller
    fn public_message(&self) -> String {
        match self {
            PaymentError::Marketplace(e) => e.to_app_error().message().to_string(),
            PaymentError::Gateway(_) => "Payment gateway is unavailable".to_string(),
            PaymentError::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            PaymentError::Internal(msg) => {
                tracing::error!(message = %msg, "Payment internal error");
            }
            PaymentError::Gateway(msg) => {
                tracing::error!(message = %msg, "Payment gateway error");
            }
            PaymentError::InvalidWebhook(reason) => {
                tracing::warn!(reason = %reason, "Payment webhook rejected");
            }
            PaymentError::NotConfigured(provider) => {
                tracing::warn!(provider = %provider, "Payment gateway not configured");
            }
            PaymentError::Marketplace(MarketplaceError::Database(e)) => {
                tracing::error!(error = %e, "Payment database error");
            }
            _ => {
                tracing::debug!(error = %self, "Payment error");
            }
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        AppError::new(err.kind(), err.public_message())
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        self.log();
        let body = json!({ "success": false, "error": self.public_message() });
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(
            PaymentError::invalid_webhook("bad signature").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            PaymentError::NotConfigured(PaymentProvider::Ozow).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            PaymentError::Gateway("timeout".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            PaymentError::from(MarketplaceError::NotFound("Order")).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn internal_details_are_hidden() {
        let app: AppError = PaymentError::Internal("connection refused at 10.0.0.4".into()).into();
        assert_eq!(app.status_code(), 500);
        assert!(!app.message().contains("10.0.0.4"));

        let app: AppError = PaymentError::Gateway("tls handshake".into()).into();
        assert_eq!(app.message(), "Payment gateway is unavailable");
    }
}
