//! End-to-end tests for the middleware pipeline: rate limiting,
//! authentication, validation, and the response envelope contract.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use game_catalog_api::{AppState, Config, build_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const WRITER_KEY: &str = "writer_key_789";
const READONLY_KEY: &str = "readonly_key_456";
const ADMIN_KEY: &str = "admin_key_123";

fn app() -> Router {
    build_router(AppState::new(Config::default()))
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn game_payload(name: &str) -> Value {
    json!({ "name": name, "category": "RPG", "price": 19.99, "rating": 8.0 })
}

fn post_game(payload: &Value, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/games")
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(payload.to_string())).unwrap()
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn create_without_key_is_unauthorized() {
    let app = app();

    let response = app
        .oneshot(post_game(&game_payload("Hades"), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let envelope = body_json(response).await;
    assert_eq!(envelope["success"], false);
    assert!(
        envelope["errors"]
            .as_array()
            .unwrap()
            .iter()
            .any(|e| e.as_str().unwrap().contains("X-API-Key"))
    );
}

#[tokio::test]
async fn create_with_invalid_key_is_unauthorized() {
    let app = app();

    let response = app
        .oneshot(post_game(&game_payload("Hades"), Some("bogus")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_key_on_optional_route_is_anonymous() {
    let app = app();

    // Reads allow anonymous access; a bad key is treated as no key
    let request = Request::builder()
        .uri("/api/games")
        .header("x-api-key", "bogus")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn rejected_credentials_do_not_consume_route_budgets() {
    let app = app();

    // Burn more than the strict create budget with unauthenticated posts
    for _ in 0..12 {
        let response = app
            .clone()
            .oneshot(post_game(&game_payload("Denied"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // The strict budget is untouched; a real writer still gets through
    let response = app
        .oneshot(post_game(&game_payload("Hades"), Some(WRITER_KEY)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn create_with_readonly_key_is_forbidden() {
    let app = app();

    let response = app
        .oneshot(post_game(&game_payload("Hades"), Some(READONLY_KEY)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let envelope = body_json(response).await;
    assert_eq!(envelope["success"], false);
    assert!(envelope["errors"][0].as_str().unwrap().contains("write"));
}

#[tokio::test]
async fn create_with_writer_key_succeeds() {
    let app = app();

    let response = app
        .oneshot(post_game(&game_payload("Hades"), Some(WRITER_KEY)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let envelope = body_json(response).await;
    assert_eq!(envelope["success"], true);
    assert_eq!(envelope["data"]["name"], "Hades");
    assert!(envelope["timestamp"].is_string());
}

#[tokio::test]
async fn bearer_header_is_accepted() {
    let app = app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/games")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {WRITER_KEY}"))
        .body(Body::from(game_payload("Celeste").to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn query_param_key_still_works() {
    let app = app();

    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/games?api_key={WRITER_KEY}"))
        .header("content-type", "application/json")
        .body(Body::from(game_payload("Celeste").to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn delete_requires_delete_permission() {
    let app = app();

    let response = app
        .clone()
        .oneshot(post_game(&game_payload("Hades"), Some(WRITER_KEY)))
        .await
        .unwrap();
    let id = body_json(response).await["data"]["id"].as_u64().unwrap();

    // Writer holds write but not delete
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/games/{id}"))
        .header("x-api-key", WRITER_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/games/{id}"))
        .header("x-api-key", ADMIN_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn sql_injection_is_rejected() {
    let app = app();
    let payload = json!({
        "name": "'; DROP TABLE games; --",
        "category": "RPG",
        "price": 19.99,
        "rating": 8.0
    });

    let response = app.oneshot(post_game(&payload, Some(WRITER_KEY))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let envelope = body_json(response).await;
    assert_eq!(envelope["success"], false);
    assert!(!envelope["errors"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn xss_payload_is_rejected() {
    let app = app();
    let payload = json!({
        "name": "<script>alert('xss')</script>",
        "category": "RPG",
        "price": 19.99,
        "rating": 8.0
    });

    let response = app.oneshot(post_game(&payload, Some(WRITER_KEY))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn out_of_range_rating_is_rejected() {
    let app = app();
    let payload = json!({ "name": "ok", "category": "RPG", "price": 19.99, "rating": 11.0 });

    let response = app.oneshot(post_game(&payload, Some(WRITER_KEY))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let envelope = body_json(response).await;
    assert!(
        envelope["errors"]
            .as_array()
            .unwrap()
            .iter()
            .any(|e| e.as_str().unwrap().contains("rating"))
    );
}

#[tokio::test]
async fn oversized_payload_is_rejected() {
    let app = app();
    let payload = json!({
        "name": "ok",
        "category": "RPG",
        "price": 19.99,
        "rating": 8.0,
        "blob": "a".repeat(11 * 1024)
    });

    let response = app.oneshot(post_game(&payload, Some(WRITER_KEY))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let envelope = body_json(response).await;
    assert!(
        envelope["errors"]
            .as_array()
            .unwrap()
            .iter()
            .any(|e| e.as_str().unwrap().contains("too large"))
    );
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let app = app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/games")
        .header("content-type", "application/json")
        .header("x-api-key", WRITER_KEY)
        .body(Body::from("{truncated"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn string_fields_are_sanitized_on_create() {
    let app = app();
    // Quotes are stripped by the sanitizer but pass validation
    let payload = json!({
        "name": "Baldur's Gate 3",
        "category": "RPG",
        "price": 59.99,
        "rating": 9.8
    });

    let response = app.oneshot(post_game(&payload, Some(WRITER_KEY))).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let envelope = body_json(response).await;
    assert_eq!(envelope["data"]["name"], "Baldurs Gate 3");
}

#[tokio::test]
async fn string_fields_are_sanitized_on_update() {
    let app = app();

    let response = app
        .clone()
        .oneshot(post_game(&game_payload("Hades"), Some(WRITER_KEY)))
        .await
        .unwrap();
    let id = body_json(response).await["data"]["id"].as_u64().unwrap();

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/api/games/{id}"))
        .header("content-type", "application/json")
        .header("x-api-key", WRITER_KEY)
        .body(Body::from(json!({ "name": "Hades II: It's Here" }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let envelope = body_json(response).await;
    assert_eq!(envelope["data"]["name"], "Hades II: Its Here");
}

#[tokio::test]
async fn empty_body_is_rejected_with_envelope() {
    let app = app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/games")
        .header("content-type", "application/json")
        .header("x-api-key", WRITER_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let envelope = body_json(response).await;
    assert_eq!(envelope["success"], false);
}

#[tokio::test]
async fn missing_content_type_is_rejected_with_envelope() {
    let app = app();

    // No Content-Type header; the body itself is fine
    let request = Request::builder()
        .method("POST")
        .uri("/api/games")
        .header("x-api-key", WRITER_KEY)
        .body(Body::from(game_payload("Hades").to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let envelope = body_json(response).await;
    assert_eq!(envelope["success"], false);
    assert!(envelope["timestamp"].is_string());
}

// =============================================================================
// Rate Limiting
// =============================================================================

#[tokio::test]
async fn strict_create_limit_kicks_in() {
    let app = app();

    for i in 0..10 {
        let response = app
            .clone()
            .oneshot(post_game(&game_payload(&format!("Game {i}")), Some(WRITER_KEY)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED, "request {i}");
    }

    let response = app
        .oneshot(post_game(&game_payload("One Too Many"), Some(WRITER_KEY)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
    let envelope = body_json(response).await;
    assert_eq!(envelope["success"], false);
}

#[tokio::test]
async fn per_minute_limit_exhausts_and_reports_headers() {
    let app = app();

    for i in 0..60 {
        let request = Request::builder()
            .uri("/api/games")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "request {i}");

        let remaining: u32 = response
            .headers()
            .get("x-ratelimit-remaining")
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(remaining, 59 - i);
    }

    let request = Request::builder()
        .uri("/api/games")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.headers().get("x-ratelimit-remaining").unwrap(),
        "0"
    );
    assert_eq!(response.headers().get("x-ratelimit-limit").unwrap(), "60");
    assert!(response.headers().contains_key("retry-after"));
}

#[tokio::test]
async fn rate_limits_are_per_client_ip() {
    let app = app();

    // Exhaust the strict delete budget for one IP
    for _ in 0..5 {
        let request = Request::builder()
            .method("DELETE")
            .uri("/api/games/12345")
            .header("x-api-key", ADMIN_KEY)
            .header("x-forwarded-for", "203.0.113.50")
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(request).await.unwrap();
    }

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/games/12345")
        .header("x-api-key", ADMIN_KEY)
        .header("x-forwarded-for", "203.0.113.50")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // A different client still has budget (404 means it passed the gate)
    let request = Request::builder()
        .method("DELETE")
        .uri("/api/games/12345")
        .header("x-api-key", ADMIN_KEY)
        .header("x-forwarded-for", "198.51.100.7")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rate_limit_headers_on_every_response() {
    let app = app();

    let response = app
        .oneshot(Request::builder().uri("/api/games").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "60");
    assert!(headers.contains_key("x-ratelimit-remaining"));
    assert!(headers.contains_key("x-ratelimit-reset"));
}

#[tokio::test]
async fn health_is_exempt_from_rate_limiting() {
    let app = app();

    for _ in 0..70 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn readiness_probe_is_exempt_from_rate_limiting() {
    let app = app();

    for _ in 0..70 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn debug_mode_disables_rate_limiting() {
    let config = Config {
        debug_mode: true,
        ..Config::default()
    };
    let app = build_router(AppState::new(config));

    for _ in 0..70 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/games").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

// =============================================================================
// Envelope and Headers
// =============================================================================

#[tokio::test]
async fn unknown_path_returns_enveloped_404() {
    let app = app();

    let response = app
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get("x-frame-options").unwrap(),
        "DENY"
    );
    let envelope = body_json(response).await;
    assert_eq!(envelope["success"], false);
}

#[tokio::test]
async fn wrong_method_returns_enveloped_405() {
    let app = app();

    let request = Request::builder()
        .method("PATCH")
        .uri("/api/games")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let envelope = body_json(response).await;
    assert_eq!(envelope["success"], false);
}

#[tokio::test]
async fn security_headers_on_success() {
    let app = app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-xss-protection").unwrap(), "1; mode=block");
    assert_eq!(
        headers.get("referrer-policy").unwrap(),
        "strict-origin-when-cross-origin"
    );
    assert_eq!(
        headers.get("content-security-policy").unwrap(),
        "default-src 'self'"
    );
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = app();

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-7")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "trace-7");

    // Generated when absent
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

// =============================================================================
// Admin
// =============================================================================

#[tokio::test]
async fn admin_can_generate_key() {
    let app = app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/keys")
        .header("x-api-key", ADMIN_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let envelope = body_json(response).await;
    let key = envelope["data"]["api_key"].as_str().unwrap();
    assert_eq!(key.len(), 43);
}

#[tokio::test]
async fn writer_cannot_generate_key() {
    let app = app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/keys")
        .header("x-api-key", WRITER_KEY)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
