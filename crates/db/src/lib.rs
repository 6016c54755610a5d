//! PostgreSQL side of the audit sync: session setup and the staged loader.

use std::time::Duration;

use satori_sync_core::config::DbConfig;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

pub mod loader;
pub mod models;
pub mod repositories;
pub mod staging;

pub type DbPool = sqlx::PgPool;

/// Open the single-connection session used by one invocation.
///
/// Connects over the Unix socket at `<socket_root>/<server>` rather than a
/// TCP host, as managed instances expose it to sandboxed compute.
pub async fn connect(config: &DbConfig) -> Result<DbPool, sqlx::Error> {
    let options = PgConnectOptions::new()
        .socket(config.socket_dir())
        .port(config.port)
        .username(&config.username)
        .password(&config.password)
        .database(&config.database);

    tracing::debug!(
        socket_dir = %config.socket_dir().display(),
        database = %config.database,
        "Opening database session",
    );

    PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await
}

/// Verify the session can run a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
