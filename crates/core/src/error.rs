#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("Invalid configuration for {name}: {reason}")]
    InvalidConfig { name: &'static str, reason: String },

    #[error("Invalid trigger payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid extraction window: {0}")]
    InvalidWindow(String),
}
