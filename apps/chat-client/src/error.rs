use tokio_tungstenite::tungstenite;

/// Client-level error type.
///
/// None of these are fatal to a running client: transport failures feed the
/// reconnect loop and encode failures drop the offending frame.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ClientError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<tungstenite::Error> for ClientError {
    fn from(err: tungstenite::Error) -> Self {
        tracing::debug!(?err, "websocket error");
        Self::Transport(err.to_string())
    }
}
