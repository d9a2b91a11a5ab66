//! Standard JSON response envelope.
//!
//! Every endpoint, success or failure, answers with the same shape:
//!
//! ```json
//! {
//!   "success": true,
//!   "message": "Games retrieved successfully",
//!   "data": [...],
//!   "count": 3,
//!   "timestamp": "2026-08-28T12:00:00Z"
//! }
//! ```
//!
//! `data`, `count` and `errors` are omitted when not applicable. Failures
//! set `success: false` and carry a list of specific `errors` where the
//! gate that rejected the request can name them (validation produces
//! per-field messages, rate limiting produces a retry hint).

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Uniform response envelope used by all handlers and middleware gates.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    /// Whether the operation succeeded
    pub success: bool,
    /// Human-readable summary of the outcome
    pub message: String,
    /// Payload for successful operations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Element count for list results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Specific error descriptions on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    /// When the response was produced
    pub timestamp: DateTime<Utc>,
}

impl ApiResponse {
    /// Build a success envelope with a message and no payload.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            count: None,
            errors: None,
            timestamp: Utc::now(),
        }
    }

    /// Build a failure envelope with a message and no error list.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            count: None,
            errors: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach a serializable payload.
    ///
    /// Serialization of response DTOs is infallible in practice; if it
    /// ever fails the payload degrades to JSON `null` rather than
    /// aborting the response.
    pub fn with_data<T: Serialize>(mut self, data: &T) -> Self {
        self.data = Some(serde_json::to_value(data).unwrap_or(serde_json::Value::Null));
        self
    }

    /// Attach an element count (list results).
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Attach specific error descriptions.
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        if !errors.is_empty() {
            self.errors = Some(errors);
        }
        self
    }

    /// Render this envelope with the given status code.
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}
