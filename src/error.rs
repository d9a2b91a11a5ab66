use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::response::ApiResponse;

/// Application-wide error taxonomy with matching HTTP status codes.
///
/// Every gate in the request pipeline converts its failure into one of
/// these variants at the point where the failure is detected; errors are
/// rendered into the standard envelope locally and never propagate as
/// panics to outer layers.
///
/// # Retryability
///
/// - `RateLimitExceeded` - retryable after `retry_after` seconds
/// - `InvalidInput` - retryable after correcting the payload
/// - `Unauthenticated` / `Unauthorized` / `NotFound` - not retryable as-is
/// - `PayloadTooLarge` - not retryable without reducing the payload
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Rate limit exceeded, retry after {retry_after}s")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    #[error("Insufficient permissions: {0}")]
    Unauthorized(String),

    #[error("Invalid input")]
    InvalidInput(Vec<String>),

    #[error("Resource not found")]
    NotFound,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log full detail server-side; clients see sanitized messages only
        match &self {
            AppError::Internal(_) | AppError::ConfigError(_) => {
                tracing::error!(error = %self, "Request failed");
            }
            _ => tracing::warn!(error = %self, "Request rejected"),
        }

        match self {
            AppError::RateLimitExceeded { retry_after } => {
                let envelope = ApiResponse::error("Rate limit exceeded").with_errors(vec![
                    "You have exceeded the allowed number of requests".to_string(),
                    format!("Try again in {retry_after} seconds"),
                ]);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [("Retry-After", retry_after.to_string())],
                    axum::Json(envelope),
                )
                    .into_response()
            }
            AppError::Unauthenticated(detail) => ApiResponse::error("API key required")
                .with_errors(vec![
                    detail,
                    "Use the 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header"
                        .to_string(),
                ])
                .into_response_with_status(StatusCode::UNAUTHORIZED),
            AppError::Unauthorized(detail) => ApiResponse::error("Insufficient permissions")
                .with_errors(vec![detail])
                .into_response_with_status(StatusCode::FORBIDDEN),
            AppError::InvalidInput(errors) => ApiResponse::error("Invalid input data")
                .with_errors(errors)
                .into_response_with_status(StatusCode::BAD_REQUEST),
            AppError::NotFound => ApiResponse::error("Resource not found")
                .with_errors(vec![
                    "The requested resource does not exist".to_string(),
                ])
                .into_response_with_status(StatusCode::NOT_FOUND),
            AppError::BadRequest(detail) => ApiResponse::error("Invalid request")
                .with_errors(vec![detail])
                .into_response_with_status(StatusCode::BAD_REQUEST),
            AppError::PayloadTooLarge => ApiResponse::error("Request too large")
                .with_errors(vec![
                    "The request body exceeds the allowed size".to_string(),
                ])
                .into_response_with_status(StatusCode::PAYLOAD_TOO_LARGE),
            AppError::MethodNotAllowed => ApiResponse::error("Method not allowed")
                .into_response_with_status(StatusCode::METHOD_NOT_ALLOWED),
            // Internal details are logged above, never exposed to clients
            AppError::Internal(_) | AppError::ConfigError(_) => {
                ApiResponse::error("Internal server error")
                    .with_errors(vec!["An unexpected error occurred".to_string()])
                    .into_response_with_status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
