//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the stroke store (Postgres or in-memory, behind one trait) and
//! the per-board relay that fans stroke and erase events out to WebSockets.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::services::persistence::StrokeRepo;
use crate::services::relay::Relay;

/// Clone is required by Axum; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StrokeRepo>,
    pub relay: Relay,
    /// Length of codes minted by `/generate-id`.
    pub board_id_length: usize,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn StrokeRepo>, config: &ServerConfig) -> Self {
        Self {
            store,
            relay: Relay::new(config.relay_channel_capacity),
            board_id_length: config.board_id_length,
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
