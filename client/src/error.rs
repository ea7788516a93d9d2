use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url `{0}`: expected ws:// or wss://")]
    InvalidUrl(String),

    #[error("reconnect delay must be greater than zero")]
    ZeroReconnectDelay,

    #[error("render interval must be greater than zero")]
    ZeroRenderInterval,

    #[error("websocket error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}
