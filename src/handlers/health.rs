//! Health, service statistics, and API index handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use chrono::Utc;
use serde_json::json;

use crate::models::{ApiInfo, HealthStatus, ServiceStats};
use crate::response::ApiResponse;
use crate::state::AppState;

/// `GET /health` - liveness probe. Exempt from rate limiting.
pub async fn health() -> Response {
    let status = HealthStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    };

    ApiResponse::ok("Service is healthy")
        .with_data(&status)
        .into_response_with_status(StatusCode::OK)
}

/// `GET /ready` - readiness probe. Answers once the store is reachable,
/// which for the in-memory store means as soon as the router is up.
pub async fn readiness(State(state): State<AppState>) -> Response {
    let games = state.store.games_count().await;

    ApiResponse::ok("Service is ready")
        .with_data(&json!({ "status": "ready", "games_count": games }))
        .into_response_with_status(StatusCode::OK)
}

/// `GET /stats` - runtime counters for operators.
pub async fn service_stats(State(state): State<AppState>) -> Response {
    let tracked_clients = state.limiter.tracked_clients();
    crate::metrics::set_tracked_clients(tracked_clients);

    let stats = ServiceStats {
        uptime_seconds: state.uptime_seconds(),
        games_count: state.store.games_count().await,
        developers_count: state.store.developers_count().await,
        tracked_clients,
    };

    ApiResponse::ok("Service statistics")
        .with_data(&stats)
        .into_response_with_status(StatusCode::OK)
}

/// `GET /api/` - self-describing endpoint index.
pub async fn api_info() -> Response {
    let info = ApiInfo {
        name: "Game Catalog API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "REST API for a videogame and developer catalog".to_string(),
        endpoints: json!({
            "games": {
                "list": "GET /api/games",
                "get": "GET /api/games/{id}",
                "create": "POST /api/games",
                "update": "PUT /api/games/{id}",
                "delete": "DELETE /api/games/{id}",
                "categories": "GET /api/games/categories",
                "statistics": "GET /api/games/statistics"
            },
            "developers": {
                "list": "GET /api/developers",
                "get": "GET /api/developers/{id}",
                "games": "GET /api/developers/{id}/games",
                "create": "POST /api/developers",
                "update": "PUT /api/developers/{id}",
                "delete": "DELETE /api/developers/{id}"
            },
            "admin": {
                "generate_key": "POST /api/admin/keys"
            },
            "service": {
                "health": "GET /health",
                "ready": "GET /ready",
                "stats": "GET /stats"
            }
        }),
    };

    ApiResponse::ok("Game Catalog API")
        .with_data(&info)
        .into_response_with_status(StatusCode::OK)
}
