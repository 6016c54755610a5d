use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use satori_sync_core::error::CoreError;
use satori_sync_db::loader::LoadError;
use satori_sync_satori::fetcher::FetchError;
use serde_json::json;

/// Failure of one trigger invocation.
///
/// Every variant maps to a non-2xx response so the push subscription
/// redelivers the message and the failure is visible to alerting.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The trigger message could not be decoded into a window.
    #[error(transparent)]
    Payload(#[from] CoreError),

    /// Authentication or export against Satori failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The database session could not be opened.
    #[error("Database connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    /// A load step failed.
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Convenience type alias for handler return values.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// HTTP status and stable error code for this failure.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            PipelineError::Payload(_) => (StatusCode::BAD_REQUEST, "INVALID_PAYLOAD"),
            PipelineError::Fetch(FetchError::Client(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CLIENT_ERROR")
            }
            PipelineError::Fetch(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            PipelineError::Connect(_) => (StatusCode::SERVICE_UNAVAILABLE, "DATABASE_UNAVAILABLE"),
            PipelineError::Load(_) => (StatusCode::INTERNAL_SERVER_ERROR, "LOAD_ERROR"),
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(error = %self, code, "Invocation failed");
        } else {
            tracing::warn!(error = %self, code, "Invocation rejected");
        }

        let body = json!({
            "error": self.to_string(),
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
