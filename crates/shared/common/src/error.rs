//! Unified error handling.
//!
//! Every workflow failure carries a machine-checkable kind (`code()`) and a
//! short human-readable message, and converts into an Axum HTTP response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Application error types.
#[derive(Error, Debug)]
pub enum AppError {
    // Client errors
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    // Pending registration lifecycle
    #[error("Registration session has expired. Please register again.")]
    Expired,

    #[error("Invalid verification code")]
    Mismatch,

    // Collaborator failures
    #[error("Failed to send verification email: {0}")]
    Delivery(String),

    #[error("Failed to save user: {0}")]
    Persistence(String),

    #[cfg(feature = "database")]
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error response body for HTTP
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    /// Retry, resend or re-verify can succeed without a new signup
    recoverable: bool,
}

impl AppError {
    /// Get error code for client
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Conflict(_) => "CONFLICT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Expired => "EXPIRED",
            AppError::Mismatch => "CODE_MISMATCH",
            AppError::Delivery(_) => "DELIVERY_FAILED",
            AppError::Persistence(_) => "PERSISTENCE_ERROR",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Mismatch => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Expired => StatusCode::GONE,
            AppError::Delivery(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the caller can recover without restarting signup
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Mismatch | AppError::Delivery(_) | AppError::Persistence(_)
        )
    }

    /// Get user-facing message (hides internal details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::Delivery(reason) => {
                tracing::warn!("Email delivery failed: {}", reason);
                "Failed to send verification email. Please try again.".to_string()
            }
            AppError::Persistence(reason) => {
                tracing::error!("Persistence failed: {}", reason);
                "Failed to complete registration. Please verify again.".to_string()
            }
            #[cfg(feature = "database")]
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "A database error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }

            _ => self.to_string(),
        }
    }
}

// =============================================================================
// HTTP Response (Axum)
// =============================================================================

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code().to_string(),
                message: self.user_message(),
                recoverable: self.is_recoverable(),
            },
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::Password(msg) => AppError::Validation(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Response for a handler that panicked; plugs into tower-http `CatchPanicLayer`.
pub fn panic_response(_panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    tracing::error!("Request handler panicked");
    AppError::internal("handler panicked").into_response()
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Convenience constructors
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn delivery(reason: impl Into<String>) -> Self {
        AppError::Delivery(reason.into())
    }

    pub fn persistence(reason: impl Into<String>) -> Self {
        AppError::Persistence(reason.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_response() {
        let (status, json) = body_json(AppError::validation("First name is required")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"]["message"], "First name is required");
    }

    #[tokio::test]
    async fn test_expired_maps_to_gone() {
        let (status, json) = body_json(AppError::Expired).await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(json["error"]["code"], "EXPIRED");
        assert_eq!(json["error"]["recoverable"], false);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_marked_recoverable() {
        let (status, json) = body_json(AppError::delivery("smtp down")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"]["code"], "DELIVERY_FAILED");
        assert_eq!(json["error"]["recoverable"], true);
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, json) = body_json(AppError::internal("pool exhausted at db.rs:42")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(AppError::Mismatch.is_recoverable());
        assert!(AppError::delivery("smtp down").is_recoverable());
        assert!(!AppError::Expired.is_recoverable());
        assert!(!AppError::conflict("already exists").is_recoverable());
    }

    #[test]
    fn test_domain_error_conversion() {
        let err: AppError = DomainError::validation("invalid role").into();
        assert!(matches!(err, AppError::Validation(ref m) if m == "invalid role"));
    }
}
