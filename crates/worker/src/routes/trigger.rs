//! Push endpoint invoked by the scheduled trigger.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use satori_sync_core::trigger::PushEnvelope;

use crate::error::PipelineResult;
use crate::pipeline::{self, InvocationReport};
use crate::state::AppState;

/// Response body of a successful invocation.
#[derive(Debug, serde::Serialize)]
pub struct TriggerResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub report: InvocationReport,
}

/// POST /
///
/// Decodes `message.data` into `days_ago` before doing any network or
/// database work, then runs one invocation. Failures map to non-2xx
/// responses so the message is redelivered.
pub async fn handle_trigger(
    State(state): State<AppState>,
    body: Bytes,
) -> PipelineResult<Json<TriggerResponse>> {
    let envelope = PushEnvelope::from_slice(&body)?;
    let days_ago = envelope.days_ago()?;

    tracing::info!(
        days_ago,
        message_id = envelope.message_id().unwrap_or("-"),
        "Trigger received",
    );

    let report = pipeline::run_invocation(&state, days_ago).await?;

    Ok(Json(TriggerResponse {
        status: "ok",
        report,
    }))
}
