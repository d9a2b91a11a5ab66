//! Request payload validation middleware.
//!
//! Buffers the JSON body of mutating requests, runs it through the
//! validator before any handler sees it, and optionally sanitizes string
//! fields in place. Rejections short-circuit with the standard error
//! envelope:
//!
//! - unreadable or oversized body: 413
//! - empty body: 400 (every route carrying this layer takes a payload)
//! - malformed JSON: 400
//! - validation failures: 400 with the full per-field error list

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{HeaderValue, Request, Response, header};
use axum::response::IntoResponse;
use serde_json::Value;
use tower::{Layer, Service};
use tracing::debug;

use crate::error::AppError;
use crate::validation::{NumericRule, sanitize_payload, validate_payload};

/// Hard ceiling on how much body this layer will buffer. The router's
/// body limit fires first under normal configuration.
const MAX_BUFFERED_BODY: usize = 10 * 1024 * 1024;

/// JSON validation layer for mutating routes.
#[derive(Clone)]
pub struct ValidateJsonLayer {
    rules: &'static [NumericRule],
    sanitize: bool,
}

impl ValidateJsonLayer {
    /// Validate against `rules` and reject on any violation.
    pub fn new(rules: &'static [NumericRule]) -> Self {
        Self {
            rules,
            sanitize: false,
        }
    }

    /// Additionally strip dangerous substrings from string fields after
    /// validation passes.
    pub fn sanitizing(rules: &'static [NumericRule]) -> Self {
        Self {
            rules,
            sanitize: true,
        }
    }
}

impl<S> Layer<S> for ValidateJsonLayer {
    type Service = ValidateJsonService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ValidateJsonService {
            inner,
            rules: self.rules,
            sanitize: self.sanitize,
        }
    }
}

/// Validation service wrapper.
#[derive(Clone)]
pub struct ValidateJsonService<S> {
    inner: S,
    rules: &'static [NumericRule],
    sanitize: bool,
}

impl<S> Service<Request<Body>> for ValidateJsonService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let rules = self.rules;
        let sanitize = self.sanitize;
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let (mut parts, body) = req.into_parts();

            let bytes = match axum::body::to_bytes(body, MAX_BUFFERED_BODY).await {
                Ok(bytes) => bytes,
                Err(_) => return Ok(AppError::PayloadTooLarge.into_response()),
            };

            if bytes.is_empty() {
                debug!(path = %parts.uri.path(), "Rejected empty request body");
                crate::metrics::record_validation_rejection("empty_body");
                return Ok(
                    AppError::BadRequest("Request body is required".to_string()).into_response()
                );
            }

            let payload: Value = match serde_json::from_slice(&bytes) {
                Ok(payload) => payload,
                Err(error) => {
                    debug!(path = %parts.uri.path(), %error, "Rejected malformed JSON body");
                    crate::metrics::record_validation_rejection("malformed_json");
                    return Ok(AppError::BadRequest("Request body must be valid JSON".to_string())
                        .into_response());
                }
            };

            if let Err(errors) = validate_payload(&payload, rules) {
                debug!(
                    path = %parts.uri.path(),
                    violations = errors.len(),
                    "Rejected invalid payload"
                );
                crate::metrics::record_validation_rejection("invalid_payload");
                return Ok(AppError::InvalidInput(errors).into_response());
            }

            let body = if sanitize {
                let sanitized = sanitize_payload(&payload).to_string();
                if let Ok(value) = HeaderValue::from_str(&sanitized.len().to_string()) {
                    parts.headers.insert(header::CONTENT_LENGTH, value);
                }
                Body::from(sanitized)
            } else {
                Body::from(bytes)
            };

            inner.call(Request::from_parts(parts, body)).await
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::validation::game_numeric_rules;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    fn app(layer: ValidateJsonLayer) -> Router {
        // Echo handler; reaching it means validation passed
        Router::new()
            .route(
                "/",
                post(|body: String| async move { (StatusCode::OK, body) }),
            )
            .layer(layer)
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_clean_payload_passes() {
        let app = app(ValidateJsonLayer::new(game_numeric_rules()));
        let payload = json!({ "name": "Hades", "price": 24.99, "rating": 9.3 });

        let response = app.oneshot(post_json(&payload.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_json_rejected() {
        let app = app(ValidateJsonLayer::new(&[]));

        let response = app.oneshot(post_json("{not json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_injection_rejected_with_error_list() {
        let app = app(ValidateJsonLayer::new(&[]));
        let payload = json!({ "name": "'; DROP TABLE games; --" });

        let response = app.oneshot(post_json(&payload.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let envelope: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope["success"], false);
        assert!(!envelope["errors"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_numeric_rule_enforced() {
        let app = app(ValidateJsonLayer::new(game_numeric_rules()));
        let payload = json!({ "name": "ok", "rating": 12.0 });

        let response = app.oneshot(post_json(&payload.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_body_rejected_with_envelope() {
        let app = app(ValidateJsonLayer::new(&[]));
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let envelope: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(envelope["success"], false);
    }

    #[tokio::test]
    async fn test_sanitizing_layer_rewrites_body() {
        let app = app(ValidateJsonLayer::sanitizing(&[]));
        let payload = json!({ "name": "  Hades  " });

        let response = app.oneshot(post_json(&payload.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let echoed: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(echoed["name"], "Hades");
    }
}
