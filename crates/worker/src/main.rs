//! `satori-sync-worker` -- loads Satori audit entries into PostgreSQL.
//!
//! Serves a push endpoint for the scheduled trigger. Each delivered message
//! runs one fetch-and-load invocation; see `satori_sync_core::config` for the
//! environment variables.

use std::net::SocketAddr;

use satori_sync_core::config::AppConfig;
use satori_sync_worker::routes;
use satori_sync_worker::state::AppState;
use satori_sync_worker::telemetry;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    telemetry::init();

    // --- Configuration ---
    let config = AppConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });
    tracing::info!(
        table = %config.database.qualified_table(),
        socket_dir = %config.database.socket_dir().display(),
        satori_host = %config.satori.api_host,
        "Loaded configuration",
    );

    let host = config.server.host.clone();
    let port = config.server.port;

    let app = routes::build_router(AppState::new(config));

    // --- Start server ---
    let addr = SocketAddr::new(
        host.parse().unwrap_or_else(|e| {
            tracing::error!(host = %host, error = %e, "Invalid HOST address");
            std::process::exit(1);
        }),
        port,
    );
    tracing::info!(%addr, "Starting trigger endpoint");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix); the platform sends
/// SIGTERM before scaling an instance down, and an in-flight invocation is
/// allowed to finish.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
