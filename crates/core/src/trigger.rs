//! Decoding of the scheduled trigger message.
//!
//! The scheduler publishes a message whose `data` field is the base64
//! encoding of an ASCII integer: how many days back the extraction window
//! starts. The push subscription delivers it wrapped in an envelope:
//!
//! ```json
//! { "message": { "data": "MQ==", "messageId": "123" }, "subscription": "..." }
//! ```

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;

use crate::error::CoreError;

/// Push delivery envelope wrapping a single trigger message.
#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
    pub message: Option<PushMessage>,
    #[serde(default)]
    pub subscription: Option<String>,
}

/// The message carried by a [`PushEnvelope`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl PushEnvelope {
    /// Parse an envelope from a raw request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(body)
            .map_err(|e| CoreError::InvalidPayload(format!("malformed envelope: {e}")))
    }

    /// Extract and decode the `days_ago` value.
    pub fn days_ago(&self) -> Result<u32, CoreError> {
        let data = self
            .message
            .as_ref()
            .and_then(|m| m.data.as_deref())
            .ok_or_else(|| CoreError::InvalidPayload("message.data is missing".into()))?;
        decode_days_ago(data)
    }

    /// Message id assigned by the broker, if any.
    pub fn message_id(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.message_id.as_deref())
    }
}

/// Decode a base64-encoded ASCII integer into a day offset.
pub fn decode_days_ago(data: &str) -> Result<u32, CoreError> {
    let bytes = BASE64
        .decode(data.trim())
        .map_err(|e| CoreError::InvalidPayload(format!("data is not valid base64: {e}")))?;

    let text = std::str::from_utf8(&bytes)
        .map_err(|_| CoreError::InvalidPayload("decoded data is not ASCII text".into()))?;

    let text = text.trim();
    text.parse::<u32>().map_err(|_| {
        CoreError::InvalidPayload(format!("decoded data {text:?} is not a non-negative integer"))
    })
}
