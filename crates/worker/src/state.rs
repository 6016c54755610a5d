use std::sync::Arc;

use satori_sync_core::config::AppConfig;
use satori_sync_db::DbPool;
use satori_sync_satori::api::SatoriApi;
use satori_sync_satori::fetcher::{FetchError, LogFetcher};

/// Where an invocation gets its database session from.
#[derive(Clone)]
pub enum SessionSource {
    /// Open a fresh socket session per invocation and close it afterwards.
    PerInvocation,
    /// Borrow connections from an existing pool, which stays open.
    Pool(DbPool),
}

impl SessionSource {
    /// Open (or borrow) the session for one invocation.
    pub async fn open(&self, config: &AppConfig) -> Result<DbPool, sqlx::Error> {
        match self {
            SessionSource::PerInvocation => satori_sync_db::connect(&config.database).await,
            SessionSource::Pool(pool) => Ok(pool.clone()),
        }
    }

    /// Whether the session must be closed at the end of the invocation.
    pub fn closes_after_use(&self) -> bool {
        matches!(self, SessionSource::PerInvocation)
    }
}

/// Shared state available to the trigger handler via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Scheme and host of the Satori API; `https://<satori_api_host>` in production.
    pub satori_base_url: String,
    pub sessions: SessionSource,
}

impl AppState {
    /// Production state: HTTPS to the configured host, one socket session per invocation.
    pub fn new(config: AppConfig) -> Self {
        Self {
            satori_base_url: config.satori.base_url(),
            config: Arc::new(config),
            sessions: SessionSource::PerInvocation,
        }
    }

    /// Build the fetcher used by one invocation.
    pub fn fetcher(&self) -> Result<LogFetcher, FetchError> {
        let api = SatoriApi::new(self.satori_base_url.clone(), self.config.satori.http_timeout)
            .map_err(FetchError::Client)?;
        Ok(LogFetcher::with_api(api, &self.config.satori))
    }
}
