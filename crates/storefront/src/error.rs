//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Upstream collaborator failures are logged server-side with their real
//! cause and mapped to generic client-facing messages; raw upstream error
//! text is never relayed to the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use dusk_bullion_core::CheckoutError;

use crate::payments::PaymentError;
use crate::spot::SpotError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// The price feed returned no usable price; checkout cannot proceed.
    #[error("Spot price error: {0}")]
    Spot(#[from] SpotError),

    /// The payment processor rejected a request.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Checkout attempted with zero line items.
    #[error("Cart empty")]
    EmptyCart,

    /// Session load/store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::EmptyCart => Self::EmptyCart,
            CheckoutError::SpotUnavailable => {
                Self::Spot(SpotError::Unusable("spot price unavailable".to_string()))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Payment(_) | Self::Session(_) | Self::Internal(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if matches!(self, Self::Spot(_)) {
            // Spot feed hiccups are expected operational noise; log, don't page.
            tracing::warn!(error = %self, "Spot feed unavailable");
        }

        let status = match &self {
            Self::Spot(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Payment(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::EmptyCart | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Spot(_) => "Spot unavailable".to_string(),
            Self::Payment(_) => "Checkout failed".to_string(),
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::EmptyCart => "Cart empty".to_string(),
            Self::NotFound(_) | Self::BadRequest(_) => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("au-bar-1oz-pamp".to_string());
        assert_eq!(err.to_string(), "Not found: au-bar-1oz-pamp");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::Spot(SpotError::Unusable("price was 0".to_string()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(get_status(AppError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Payment(PaymentError::Api {
                status: 402,
                message: "card declined".to_string(),
            })),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
