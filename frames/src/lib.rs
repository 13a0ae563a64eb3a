//! Board event model and protobuf codec for the realtime relay.
//!
//! This crate owns the wire representation shared by the server relay and the
//! sync client. REST bodies travel as JSON through serde; relay frames are
//! protobuf for compact binary transport.

use canvas::camera::Point;
use canvas::doc::{Stroke, StrokeId};
use prost::Message;
use serde::{Deserialize, Serialize};

/// Error returned by [`decode_event`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw bytes could not be decoded as a protobuf `WireEvent`.
    #[error("failed to decode protobuf event: {0}")]
    Decode(#[from] prost::DecodeError),
    /// The `kind` integer on the wire does not map to a known event kind.
    #[error("invalid event kind: {0}")]
    InvalidKind(i32),
}

/// A change broadcast to every subscriber of a board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum BoardEvent {
    /// A stroke was persisted; carries the full stroke with its server id.
    Stroke(Stroke),
    /// A stroke was deleted.
    Erase { id: StrokeId },
}

impl BoardEvent {
    /// The stroke id this event refers to.
    #[must_use]
    pub fn stroke_id(&self) -> StrokeId {
        match self {
            Self::Stroke(stroke) => stroke.id,
            Self::Erase { id } => *id,
        }
    }

    /// Short event name, as used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stroke(_) => "stroke",
            Self::Erase { .. } => "erase",
        }
    }
}

/// Encode an event into protobuf bytes.
#[must_use]
pub fn encode_event(event: &BoardEvent) -> Vec<u8> {
    event_to_wire(event).encode_to_vec()
}

/// Decode protobuf bytes into an event.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes and
/// [`CodecError::InvalidKind`] for out-of-range kind values.
pub fn decode_event(bytes: &[u8]) -> Result<BoardEvent, CodecError> {
    let wire = WireEvent::decode(bytes)?;
    wire_to_event(wire)
}

fn event_to_wire(event: &BoardEvent) -> WireEvent {
    match event {
        BoardEvent::Stroke(stroke) => WireEvent {
            kind: WireEventKind::Stroke as i32,
            id: stroke.id,
            path: stroke.path.iter().map(|p| WirePoint { x: p.x, y: p.y }).collect(),
            color: stroke.color.clone(),
        },
        BoardEvent::Erase { id } => WireEvent {
            kind: WireEventKind::Erase as i32,
            id: *id,
            path: Vec::new(),
            color: String::new(),
        },
    }
}

fn wire_to_event(wire: WireEvent) -> Result<BoardEvent, CodecError> {
    match WireEventKind::try_from(wire.kind) {
        Ok(WireEventKind::Stroke) => Ok(BoardEvent::Stroke(Stroke {
            id: wire.id,
            path: wire.path.into_iter().map(|p| Point::new(p.x, p.y)).collect(),
            color: wire.color,
        })),
        Ok(WireEventKind::Erase) => Ok(BoardEvent::Erase { id: wire.id }),
        Err(_) => Err(CodecError::InvalidKind(wire.kind)),
    }
}

#[derive(Clone, PartialEq, Message)]
struct WireEvent {
    #[prost(enumeration = "WireEventKind", tag = "1")]
    kind: i32,
    #[prost(int64, tag = "2")]
    id: i64,
    #[prost(message, repeated, tag = "3")]
    path: Vec<WirePoint>,
    #[prost(string, tag = "4")]
    color: String,
}

#[derive(Clone, PartialEq, Message)]
struct WirePoint {
    #[prost(double, tag = "1")]
    x: f64,
    #[prost(double, tag = "2")]
    y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
enum WireEventKind {
    Stroke = 0,
    Erase = 1,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
