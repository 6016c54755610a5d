//! Retrieval of the audit CSV export for one extraction window.

use satori_sync_core::config::SatoriConfig;
use satori_sync_core::window::ExtractionWindow;

use crate::api::{SatoriApi, SatoriApiError};

/// Errors from a single retrieval.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The token exchange failed; no export was attempted.
    #[error("Satori authentication failed: {0}")]
    Authentication(#[source] SatoriApiError),

    /// The export request failed.
    #[error("Satori export failed: {0}")]
    Export(#[source] SatoriApiError),

    /// The HTTP client could not be built.
    #[error("Satori client setup failed: {0}")]
    Client(#[source] SatoriApiError),
}

/// CSV text returned by the export endpoint, with the window it covers.
#[derive(Debug, Clone)]
pub struct CsvExport {
    pub window: ExtractionWindow,
    /// Raw CSV: header row, comma delimited, columns in destination order.
    pub body: String,
}

impl CsvExport {
    /// True when the body holds at most a header row.
    pub fn is_empty(&self) -> bool {
        let mut lines = self.body.lines().filter(|l| !l.trim().is_empty());
        lines.next();
        lines.next().is_none()
    }
}

/// Authenticates against Satori and downloads data-flow exports.
pub struct LogFetcher {
    api: SatoriApi,
    service_account_id: String,
    service_account_key: String,
    account_id: String,
}

impl LogFetcher {
    /// Build a fetcher against the configured HTTPS host.
    pub fn from_config(config: &SatoriConfig) -> Result<Self, FetchError> {
        let api =
            SatoriApi::new(config.base_url(), config.http_timeout).map_err(FetchError::Client)?;
        Ok(Self::with_api(api, config))
    }

    /// Build a fetcher around an existing API client.
    pub fn with_api(api: SatoriApi, config: &SatoriConfig) -> Self {
        Self {
            api,
            service_account_id: config.service_account_id.clone(),
            service_account_key: config.service_account_key.clone(),
            account_id: config.account_id.clone(),
        }
    }

    /// Authenticate and download the export covering `window`.
    ///
    /// Authentication failure aborts the retrieval: the export endpoint is
    /// never called without a token.
    pub async fn retrieve(&self, window: ExtractionWindow) -> Result<CsvExport, FetchError> {
        tracing::info!(
            from_ms = window.from_ms(),
            to_ms = window.to_ms(),
            account_id = %self.account_id,
            "Requesting Satori audit export",
        );

        let token = self
            .api
            .authenticate(&self.service_account_id, &self.service_account_key)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Bearer token request failed");
                FetchError::Authentication(e)
            })?;

        let body = self
            .api
            .export_data_flows(&token, &self.account_id, &window)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Retrieval of audit data failed");
                FetchError::Export(e)
            })?;

        tracing::debug!(bytes = body.len(), "Audit export downloaded");

        Ok(CsvExport { window, body })
    }
}
