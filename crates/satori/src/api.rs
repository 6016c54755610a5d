//! REST API client for the Satori authentication and data-flow endpoints.
//!
//! Wraps the Satori HTTP API (service-account token exchange and data-flow
//! CSV export) using [`reqwest`].

use std::time::Duration;

use satori_sync_core::window::ExtractionWindow;
use serde::{Deserialize, Serialize};

/// HTTP client for a single Satori API host.
pub struct SatoriApi {
    client: reqwest::Client,
    base_url: String,
}

/// Body of `POST /api/authentication/token`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    service_account_id: &'a str,
    service_account_key: &'a str,
}

/// Response of `POST /api/authentication/token`.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
}

/// Errors from the Satori REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum SatoriApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, body decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Satori returned a non-2xx status code.
    #[error("Satori API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The token endpoint answered 2xx but without a usable token.
    #[error("Authentication response did not contain a token")]
    MissingToken,
}

impl SatoriApi {
    /// Create a new API client.
    ///
    /// * `base_url` - Scheme and host, e.g. `https://app.satoricyber.com`.
    /// * `timeout` - Per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SatoriApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Exchange service-account credentials for a bearer token.
    ///
    /// Sends `POST /api/authentication/token` with a JSON body of
    /// `serviceAccountId` and `serviceAccountKey`.
    pub async fn authenticate(
        &self,
        service_account_id: &str,
        service_account_key: &str,
    ) -> Result<String, SatoriApiError> {
        let body = TokenRequest {
            service_account_id,
            service_account_key,
        };

        let response = self
            .client
            .post(format!("{}/api/authentication/token", self.base_url))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let parsed: TokenResponse = response.json().await?;

        parsed
            .token
            .filter(|t| !t.is_empty())
            .ok_or(SatoriApiError::MissingToken)
    }

    /// Download the data-flow CSV export for an account and window.
    ///
    /// Sends `GET /api/data-flow/{account_id}/export?from=..&to=..` with the
    /// window bounds in epoch milliseconds. The body is returned verbatim;
    /// a truncated or paginated upstream response is not detected.
    pub async fn export_data_flows(
        &self,
        token: &str,
        account_id: &str,
        window: &ExtractionWindow,
    ) -> Result<String, SatoriApiError> {
        let response = self
            .client
            .get(format!(
                "{}/api/data-flow/{}/export",
                self.base_url, account_id
            ))
            .query(&[("from", window.from_ms()), ("to", window.to_ms())])
            .bearer_auth(token)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.text().await?)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`SatoriApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, SatoriApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SatoriApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}
