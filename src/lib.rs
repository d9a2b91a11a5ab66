//! # Game Catalog API
//!
//! A REST API for a videogame and developer catalog, built around a
//! layered security pipeline:
//!
//! - **Rate limiting**: exact sliding windows per client IP, with burst,
//!   per-minute, per-hour, and per-route strict budgets
//! - **Authentication**: static API keys mapped to roles with explicit,
//!   non-hierarchical permissions
//! - **Validation**: injection/XSS pattern rejection and numeric bounds
//!   before any handler runs, with optional sanitization
//! - **Observability**: request IDs, structured logging, Prometheus
//!   metrics on a separate listener
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     Axum HTTP Server                       │
//! ├────────────────────────────────────────────────────────────┤
//! │  Middleware (Security Headers → Request ID → Rate Limit    │
//! │              → route gates: auth → strict limit → validate)│
//! ├────────────────────────────────────────────────────────────┤
//! │  Handlers (health, games, developers, admin)               │
//! ├────────────────────────────────────────────────────────────┤
//! │  CatalogStore (in-memory, RwLock-guarded)                  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use game_catalog_api::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let state = AppState::new(config);
//!     let app = build_router(state);
//!     // Start the server...
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use response::ApiResponse;
pub use routes::build_router;
pub use state::AppState;
pub use store::CatalogStore;
