use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use game_catalog_api::{AppState, Config, build_router, metrics};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!(
        "Starting Game Catalog API v{}",
        env!("CARGO_PKG_VERSION")
    );

    match run().await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Run the application, returning an exit code on error.
async fn run() -> Result<(), exitcode::ExitCode> {
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {e}");
        exitcode::CONFIG
    })?;
    info!(
        host = %config.host,
        port = config.port,
        rate_limiting = config.rate_limiting_active(),
        debug_mode = config.debug_mode,
        "Configuration loaded"
    );

    if let Some(metrics_addr) = config.metrics_addr() {
        metrics::try_init_metrics(metrics_addr);
    }

    let state = AppState::new(config.clone());
    state.store.seed_sample_data().await;
    let app = build_router(state);

    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET    /health                     - Health check");
    info!("  GET    /ready                      - Readiness probe");
    info!("  GET    /stats                      - Service statistics");
    info!("  GET    /api/games                  - List games");
    info!("  POST   /api/games                  - Create game (write)");
    info!("  GET    /api/games/{{id}}             - Get game");
    info!("  PUT    /api/games/{{id}}             - Update game (write)");
    info!("  DELETE /api/games/{{id}}             - Delete game (delete)");
    info!("  GET    /api/games/categories       - List categories");
    info!("  GET    /api/games/statistics       - Catalog statistics");
    info!("  GET    /api/developers             - List developers");
    info!("  POST   /api/developers             - Create developer (write)");
    info!("  GET    /api/developers/{{id}}/games  - Developer's games");
    info!("  POST   /api/admin/keys             - Generate API key (admin)");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| {
        error!("Server error: {e}");
        exitcode::SOFTWARE
    })?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM so `axum::serve` can drain in-flight
/// requests before exiting.
async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            error!("Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
