//! Business logic behind the HTTP and WebSocket routes.

pub mod board;
pub mod persistence;
pub mod relay;
