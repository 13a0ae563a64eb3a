//! Board synchronization.
//!
//! DESIGN
//! ======
//! A [`BoardSession`] owns one board's [`canvas::engine::EngineCore`] behind
//! a `tokio::sync::Mutex`. Local gestures mutate the store optimistically and
//! hand their network side effects to an [`OpQueue`], which runs them one at
//! a time in submission order. Peer broadcasts are applied by a single event
//! task in arrival order. Neither path waits on the other: stroke-id dedup
//! plus in-place confirmation keep the store consistent whichever lands first.

pub mod queue;
pub mod session;

pub use queue::OpQueue;
pub use session::{BoardSession, LoadOutcome};
