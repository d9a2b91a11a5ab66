//! Application routing and middleware composition.
//!
//! # Pipeline
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌───────────────────┐
//! │ Security headers  │ ← stamped on every response
//! └─────────┬─────────┘
//!           ▼
//! ┌───────────────────┐
//! │ Request ID        │ ← X-Request-Id on every response
//! └─────────┬─────────┘
//!           ▼
//! ┌───────────────────┐
//! │ Per-minute limit  │ ← 429 + X-RateLimit-* headers; probes bypassed
//! └─────────┬─────────┘
//!           ▼
//! ┌───────────────────┐
//! │ Trace / CORS /    │
//! │ body size limit   │
//! └─────────┬─────────┘
//!           ▼
//! ┌───────────────────┐
//! │ Route gates:      │ ← auth → strict limit → validation,
//! │ (mutations only)  │   in that order
//! └─────────┬─────────┘
//!           ▼
//!        Handler
//! ```
//!
//! The global per-minute gate runs before authentication so abusive
//! traffic is rejected by the cheap check first. Route-strict budgets
//! sit behind the auth gate: a rejected credential consumes only the
//! generic per-minute budget, never a route budget.
//!
//! # Route Gates
//!
//! | Route                        | Strict limit (per min) | Permission |
//! |------------------------------|------------------------|------------|
//! | POST /api/games              | 10                     | write      |
//! | PUT /api/games/{id}          | 15                     | write      |
//! | DELETE /api/games/{id}       | 5                      | delete     |
//! | POST /api/developers         | 10                     | write      |
//! | PUT /api/developers/{id}     | 15                     | write      |
//! | DELETE /api/developers/{id}  | 5                      | delete     |
//! | POST /api/admin/keys         | 5                      | admin      |
//! | GET /api/games/statistics    | per-hour budget        | -          |

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::handler::Handler;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::AppError;
use crate::handlers::{admin, developers, games, health};
use crate::middleware::{
    ApiKeyAuthLayer, Permission, RateLimitLayer, RequestIdLayer, SecurityHeadersLayer,
    ValidateJsonLayer,
};
use crate::state::AppState;
use crate::validation::{developer_numeric_rules, game_numeric_rules};

/// Build the application router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let limiter = state.limiter.clone();
    let credentials = state.credentials.clone();
    let config = state.config.clone();

    let read_gate = || ApiKeyAuthLayer::optional(credentials.clone());
    let write_gate = |name, max| {
        ServiceBuilder::new()
            .layer(ApiKeyAuthLayer::require(
                credentials.clone(),
                Permission::Write,
            ))
            .layer(RateLimitLayer::strict(limiter.clone(), name, max))
    };
    let delete_gate = |name| {
        ServiceBuilder::new()
            .layer(ApiKeyAuthLayer::require(
                credentials.clone(),
                Permission::Delete,
            ))
            .layer(RateLimitLayer::strict(limiter.clone(), name, 5))
    };

    let router = Router::new()
        // Service endpoints
        .route("/health", get(health::health))
        .route("/ready", get(health::readiness))
        .route("/stats", get(health::service_stats))
        .route("/api", get(health::api_info))
        .route("/api/", get(health::api_info))
        // Games. Static segments before the {id} capture.
        .route(
            "/api/games/categories",
            get(games::categories.layer(read_gate())),
        )
        .route(
            "/api/games/statistics",
            get(games::statistics.layer(
                ServiceBuilder::new()
                    .layer(read_gate())
                    .layer(RateLimitLayer::per_hour(limiter.clone())),
            )),
        )
        .route(
            "/api/games",
            get(games::list_games.layer(read_gate())).post(
                games::create_game.layer(
                    write_gate("create_game", 10)
                        .layer(ValidateJsonLayer::sanitizing(game_numeric_rules())),
                ),
            ),
        )
        .route(
            "/api/games/{id}",
            get(games::get_game.layer(read_gate()))
                .put(
                    games::update_game.layer(
                        write_gate("update_game", 15)
                            .layer(ValidateJsonLayer::sanitizing(game_numeric_rules())),
                    ),
                )
                .delete(games::delete_game.layer(delete_gate("delete_game"))),
        )
        // Developers
        .route(
            "/api/developers",
            get(developers::list_developers.layer(read_gate())).post(
                developers::create_developer.layer(
                    write_gate("create_developer", 10)
                        .layer(ValidateJsonLayer::sanitizing(developer_numeric_rules())),
                ),
            ),
        )
        .route(
            "/api/developers/{id}",
            get(developers::get_developer.layer(read_gate()))
                .put(
                    developers::update_developer.layer(
                        write_gate("update_developer", 15)
                            .layer(ValidateJsonLayer::sanitizing(developer_numeric_rules())),
                    ),
                )
                .delete(developers::delete_developer.layer(delete_gate("delete_developer"))),
        )
        .route(
            "/api/developers/{id}/games",
            get(developers::developer_games.layer(read_gate())),
        )
        // Admin
        .route(
            "/api/admin/keys",
            axum::routing::post(
                admin::generate_key.layer(
                    ServiceBuilder::new()
                        .layer(ApiKeyAuthLayer::require(
                            credentials.clone(),
                            Permission::Admin,
                        ))
                        .layer(RateLimitLayer::strict(limiter.clone(), "admin_keys", 5)),
                ),
            ),
        )
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed);

    info!(
        max_body_mb = config.max_request_body_size / (1024 * 1024),
        rate_limiting = limiter.is_enabled(),
        "Router configured"
    );

    // Global layers, bottom to top; the last added is outermost.
    router
        .layer(DefaultBodyLimit::max(config.max_request_body_size))
        .layer(build_cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(RateLimitLayer::global(limiter))
        .layer(RequestIdLayer)
        .layer(SecurityHeadersLayer)
        .with_state(state)
}

/// 404 envelope for unmatched paths.
async fn not_found() -> Response {
    AppError::NotFound.into_response()
}

/// 405 envelope for matched paths with the wrong method.
async fn method_not_allowed() -> Response {
    AppError::MethodNotAllowed.into_response()
}

/// Build the CORS layer from configuration. `*` allows any origin,
/// which is fine for development only.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_any = allowed_origins.iter().any(|o| o == "*");

    if allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
