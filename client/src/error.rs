//! Error type for the sync client.

use tokio_tungstenite::tungstenite;

/// Failure of a network call or session operation.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The configured server URL has no `http://` or `https://` scheme.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    /// The HTTP request could not be sent or its body could not be read.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The relay WebSocket failed to connect or broke mid-stream.
    #[error("websocket failed: {0}")]
    WebSocket(Box<tungstenite::Error>),
    /// A relay frame could not be decoded.
    #[error("event decode failed: {0}")]
    Codec(#[from] frames::CodecError),
    /// The session was torn down before the operation started.
    #[error("board session has been torn down")]
    TornDown,
}

impl From<tungstenite::Error> for SyncError {
    fn from(error: tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(error))
    }
}
