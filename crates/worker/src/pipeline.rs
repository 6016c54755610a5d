//! One end-to-end invocation: fetch the export, then load it.
//!
//! The export is fetched before any database session is opened, so an
//! authentication or export failure never touches the destination.

use satori_sync_core::window::ExtractionWindow;
use satori_sync_db::loader::Loader;
use satori_sync_db::staging::StagingTable;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{PipelineError, PipelineResult};
use crate::state::AppState;

/// Summary of a successful invocation.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationReport {
    pub invocation_id: Uuid,
    pub days_ago: u32,
    pub from_ms: i64,
    pub to_ms: i64,
    pub staged: u64,
    pub inserted: u64,
}

/// Run the fetch and load for a window starting `days_ago` days before today.
pub async fn run_invocation(state: &AppState, days_ago: u32) -> PipelineResult<InvocationReport> {
    let invocation_id = Uuid::now_v7();
    let window = ExtractionWindow::for_today(days_ago)?;

    let span = tracing::info_span!("invocation", %invocation_id, days_ago);
    run_window(state, invocation_id, days_ago, window)
        .instrument(span)
        .await
}

async fn run_window(
    state: &AppState,
    invocation_id: Uuid,
    days_ago: u32,
    window: ExtractionWindow,
) -> PipelineResult<InvocationReport> {
    tracing::info!(
        from_ms = window.from_ms(),
        to_ms = window.to_ms(),
        "Requesting Satori audit info",
    );

    let export = state.fetcher()?.retrieve(window).await?;
    if export.is_empty() {
        tracing::info!("Export contains no audit entries");
    }

    let config = &state.config;
    let pool = state
        .sessions
        .open(config)
        .await
        .map_err(PipelineError::Connect)?;
    satori_sync_db::health_check(&pool)
        .await
        .map_err(PipelineError::Connect)?;

    let staging = StagingTable::for_invocation(&config.database.schema, invocation_id);
    let loader = Loader::new(pool, &config.database, staging);
    let outcome = loader.load(&export.body).await;

    if state.sessions.closes_after_use() {
        loader.close().await;
    }

    let report = outcome?;
    tracing::info!(
        staged = report.staged,
        inserted = report.inserted,
        "Audit sync complete",
    );

    Ok(InvocationReport {
        invocation_id,
        days_ago,
        from_ms: window.from_ms(),
        to_ms: window.to_ms(),
        staged: report.staged,
        inserted: report.inserted,
    })
}
