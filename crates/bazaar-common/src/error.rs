//! Centralized error types for Bazaar.
//!
//! Uses `thiserror` for ergonomic error definitions. The outbound variants
//! (`Signing`, `Size`, `Transmit`) are the typed, caller-visible failures of a
//! send; inbound rejections never surface here, they are dropped and logged by
//! the delivery pipeline.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Core application error type used across all Bazaar services.
#[derive(Debug, thiserror::Error)]
pub enum BazaarError {
    // === Outbound delivery ===
    #[error("Signing failed: {message}")]
    Signing { message: String },

    #[error("Envelope is {size} bytes, exceeding the {limit} byte ceiling")]
    Size { size: usize, limit: u64 },

    #[error("Transmit failed: {message}")]
    Transmit { message: String },

    // === Request errors ===
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    // === Infrastructure errors ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body sent to HTTP callers.
#[derive(Serialize)]
struct ErrorResponse {
    code: u16,
    error: String,
    message: String,
}

impl BazaarError {
    /// Map error to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Size { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Signing { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Transmit { .. } => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error code string for programmatic handling by callers.
    pub fn error_code(&self) -> &str {
        match self {
            Self::Signing { .. } => "SIGNING_ERROR",
            Self::Size { .. } => "SIZE_ERROR",
            Self::Transmit { .. } => "TRANSMIT_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for BazaarError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't leak internal details to callers
        let message = match &self {
            BazaarError::Database(e) => {
                tracing::error!("Database error: {e}");
                "An internal error occurred".to_string()
            }
            BazaarError::Internal(e) => {
                tracing::error!("Internal error: {e}");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorResponse {
            code: status.as_u16(),
            error: self.error_code().to_string(),
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for Results using BazaarError.
pub type BazaarResult<T> = Result<T, BazaarError>;
