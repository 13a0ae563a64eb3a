//! Per-board broadcast relay.
//!
//! DESIGN
//! ======
//! Each subscribed WebSocket owns a bounded `mpsc` receiver. Publishing
//! walks the board's senders and `try_send`s a clone of the event, so one
//! slow subscriber never stalls the publisher or its peers. A full or closed
//! subscriber loses that event; it is logged and the walk continues.

use std::collections::HashMap;
use std::sync::Arc;

use canvas::doc::BoardId;
use frames::BoardEvent;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

#[cfg(test)]
#[path = "relay_test.rs"]
mod relay_test;

pub type ClientId = Uuid;

type Subscribers = HashMap<ClientId, mpsc::Sender<BoardEvent>>;

#[derive(Clone)]
pub struct Relay {
    boards: Arc<RwLock<HashMap<BoardId, Subscribers>>>,
    capacity: usize,
}

impl Relay {
    /// `capacity` is each subscriber's buffer; zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { boards: Arc::new(RwLock::new(HashMap::new())), capacity: capacity.max(1) }
    }

    /// Register a subscriber on `board` and return its id and event receiver.
    pub async fn join(&self, board: &BoardId) -> (ClientId, mpsc::Receiver<BoardEvent>) {
        let client_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.capacity);
        self.boards.write().await.entry(board.clone()).or_default().insert(client_id, tx);
        debug!(%client_id, board_id = %board, "relay: subscriber joined");
        (client_id, rx)
    }

    /// Remove a subscriber. Boards with no subscribers left are dropped.
    pub async fn part(&self, board: &BoardId, client_id: ClientId) {
        let mut boards = self.boards.write().await;
        if let Some(subscribers) = boards.get_mut(board) {
            subscribers.remove(&client_id);
            if subscribers.is_empty() {
                boards.remove(board);
            }
        }
        debug!(%client_id, board_id = %board, "relay: subscriber parted");
    }

    /// Send `event` to every subscriber of `board`. Returns how many accepted it.
    pub async fn publish(&self, board: &BoardId, event: &BoardEvent) -> usize {
        let boards = self.boards.read().await;
        let Some(subscribers) = boards.get(board) else {
            return 0;
        };
        let mut delivered = 0;
        for (client_id, tx) in subscribers {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(%client_id, board_id = %board, kind = event.kind(), error = %e, "relay: event dropped"),
            }
        }
        delivered
    }

    pub async fn subscriber_count(&self, board: &BoardId) -> usize {
        self.boards.read().await.get(board).map_or(0, HashMap::len)
    }
}
