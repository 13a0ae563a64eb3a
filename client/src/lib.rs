//! Sync client for the collaborative drawing board.
//!
//! Wraps a [`canvas::engine::EngineCore`] in a [`sync::BoardSession`] that
//! loads the board snapshot, persists committed strokes and erasures through
//! an ordered operation queue, and merges peer broadcasts into the local
//! stroke store.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`sync`] | Board session and FIFO operation queue |
//! | [`net`] | REST ([`net::StrokeApi`]) and relay ([`net::BoardChannel`]) transports |
//! | [`config`] | Server base URL and endpoint helpers |
//! | [`error`] | [`SyncError`] shared by every fallible operation |

pub mod config;
pub mod error;
pub mod net;
pub mod sync;

pub use config::ClientConfig;
pub use error::SyncError;
pub use sync::{BoardSession, LoadOutcome, OpQueue};
