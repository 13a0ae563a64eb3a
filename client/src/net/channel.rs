//! Board relay subscription.
//!
//! DESIGN
//! ======
//! A subscription is a stream of decoded [`BoardEvent`]s. The WebSocket
//! implementation ignores text, ping and pong messages, ends the stream on a
//! close frame, and yields a transport error at most once before ending.

use canvas::doc::BoardId;
use frames::BoardEvent;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::SyncError;

/// Events from one board's relay, in arrival order.
pub type EventStream = BoxStream<'static, Result<BoardEvent, SyncError>>;

/// Source of peer broadcasts for a board. Enables mocking in tests.
#[async_trait::async_trait]
pub trait BoardChannel: Send + Sync {
    /// Subscribe to `board`. Dropping the stream unsubscribes.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] if the subscription cannot be established.
    async fn subscribe(&self, board: &BoardId) -> Result<EventStream, SyncError>;
}

/// [`BoardChannel`] over the server's `/ws` endpoint.
#[derive(Debug, Clone)]
pub struct WsBoardChannel {
    config: ClientConfig,
}

impl WsBoardChannel {
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl BoardChannel for WsBoardChannel {
    async fn subscribe(&self, board: &BoardId) -> Result<EventStream, SyncError> {
        let url = self.config.ws_url(board)?;
        let (socket, _) = connect_async(url).await?;
        info!(board_id = %board, "relay subscribed");

        let events = futures_util::stream::unfold(Some(socket), |state| async move {
            let mut socket = state?;
            loop {
                match socket.next().await? {
                    Ok(Message::Binary(bytes)) => {
                        let event = frames::decode_event(&bytes).map_err(SyncError::from);
                        return Some((event, Some(socket)));
                    }
                    Ok(Message::Close(_)) => return None,
                    Ok(_) => {}
                    Err(e) => return Some((Err(SyncError::from(e)), None)),
                }
            }
        });
        Ok(events.boxed())
    }
}
