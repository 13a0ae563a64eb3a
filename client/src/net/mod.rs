//! Networking for the REST stroke API and the board relay.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` handles REST calls (`/strokes`, `/generate-id`) and `channel`
//! subscribes to a board's relay WebSocket. Both sit behind async traits so
//! the sync session can be driven by in-process fakes in tests.

pub mod api;
pub mod channel;

pub use api::{HttpStrokeApi, NewStroke, StrokeApi};
pub use channel::{BoardChannel, EventStream, WsBoardChannel};
