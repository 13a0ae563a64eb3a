//! Document model: strokes, board codes, and the in-memory stroke store.
//!
//! This module defines what is on the canvas (`Stroke`), how a board is named
//! (`BoardId`), and the runtime store that owns every live stroke for the
//! active board (`StrokeStore`).
//!
//! Data flows into this layer from the network (initial fetch, peer
//! broadcasts, create confirmations) and from the input engine (optimistic
//! commits and erases). The renderer reads the store in iteration order,
//! which is creation order: later strokes are drawn on top.
//!
//! IDS
//! ===
//! Server ids are positive. Strokes drawn locally carry a provisional id
//! (negative, strictly decreasing) until the create response arrives and
//! [`StrokeStore::confirm`] swaps in the authoritative stroke. Ids are unique
//! within a store at all times; duplicate inserts are dropped.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::camera::Point;

/// Identifier for a stroke. Negative values are provisional.
pub type StrokeId = i64;

/// Minimum length of a board code.
pub const MIN_BOARD_ID_LEN: usize = 8;

/// Whether `id` was assigned locally and is still awaiting confirmation.
#[must_use]
pub fn is_provisional(id: StrokeId) -> bool {
    id < 0
}

/// A freehand stroke as stored in the document and on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Server id, or a provisional id before persistence completes.
    pub id: StrokeId,
    /// Sampled points in the order they were drawn.
    pub path: Vec<Point>,
    /// CSS color string.
    pub color: String,
}

// =============================================================
// Board codes
// =============================================================

/// Rejected board code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid board id: {0:?}")]
pub struct InvalidBoardId(pub String);

/// Opaque board code matching `^[A-Za-z0-9\-_]{8,}$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BoardId(String);

impl BoardId {
    /// Validate and wrap a board code.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBoardId`] when the code is shorter than
    /// [`MIN_BOARD_ID_LEN`] or contains characters outside `[A-Za-z0-9-_]`.
    pub fn parse(raw: &str) -> Result<Self, InvalidBoardId> {
        if is_valid_board_id(raw) {
            Ok(Self(raw.to_owned()))
        } else {
            Err(InvalidBoardId(raw.to_owned()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Check a raw board code without allocating.
#[must_use]
pub fn is_valid_board_id(raw: &str) -> bool {
    raw.len() >= MIN_BOARD_ID_LEN
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BoardId {
    type Err = InvalidBoardId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BoardId {
    type Error = InvalidBoardId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_valid_board_id(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidBoardId(value))
        }
    }
}

impl From<BoardId> for String {
    fn from(id: BoardId) -> Self {
        id.0
    }
}

// =============================================================
// Provisional ids
// =============================================================

/// Issues provisional stroke ids: negated wall-clock milliseconds, forced to
/// strictly decrease so two commits in the same millisecond never collide.
#[derive(Debug, Clone, Default)]
pub struct ProvisionalIds {
    last: StrokeId,
}

impl ProvisionalIds {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next provisional id for a commit happening at `now_ms`.
    pub fn next(&mut self, now_ms: i64) -> StrokeId {
        let candidate = -now_ms.max(1);
        let id = candidate.min(self.last - 1);
        self.last = id;
        id
    }
}

// =============================================================
// Store
// =============================================================

/// Outcome of [`StrokeStore::confirm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// The provisional entry was replaced in place by the confirmed stroke.
    Replaced,
    /// The confirmed id was already present (its broadcast won the race);
    /// the provisional entry was dropped.
    Deduplicated,
    /// The provisional entry was gone (erased before confirmation). The
    /// confirmed stroke was not inserted.
    Orphaned,
}

/// Ordered in-memory collection of strokes for one board.
#[derive(Debug, Clone, Default)]
pub struct StrokeStore {
    strokes: Vec<Stroke>,
}

impl StrokeStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { strokes: Vec::new() }
    }

    /// Append a stroke unless its id is already present.
    ///
    /// Returns `true` if the stroke was appended.
    pub fn insert(&mut self, stroke: Stroke) -> bool {
        if self.contains(stroke.id) {
            return false;
        }
        self.strokes.push(stroke);
        true
    }

    /// Remove a stroke by id, returning it if it was present.
    pub fn remove(&mut self, id: StrokeId) -> Option<Stroke> {
        let idx = self.position(id)?;
        Some(self.strokes.remove(idx))
    }

    /// Return a reference to a stroke by id.
    #[must_use]
    pub fn get(&self, id: StrokeId) -> Option<&Stroke> {
        self.strokes.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: StrokeId) -> bool {
        self.position(id).is_some()
    }

    /// Swap a provisional entry for the server-confirmed stroke.
    pub fn confirm(&mut self, provisional: StrokeId, confirmed: Stroke) -> Confirmation {
        let Some(idx) = self.position(provisional) else {
            return Confirmation::Orphaned;
        };
        if self.contains(confirmed.id) {
            self.strokes.remove(idx);
            return Confirmation::Deduplicated;
        }
        self.strokes[idx] = confirmed;
        Confirmation::Replaced
    }

    /// Replace all confirmed strokes with a server snapshot.
    ///
    /// Provisional strokes still awaiting confirmation survive and are kept
    /// after the snapshot, in their original order. Duplicate ids in the
    /// snapshot keep their first occurrence.
    pub fn load_snapshot(&mut self, snapshot: Vec<Stroke>) {
        let pending: Vec<Stroke> = self
            .strokes
            .drain(..)
            .filter(|s| is_provisional(s.id))
            .collect();
        for stroke in snapshot.into_iter().chain(pending) {
            self.insert(stroke);
        }
    }

    /// Strokes in creation (draw) order.
    pub fn iter(&self) -> impl Iterator<Item = &Stroke> {
        self.strokes.iter()
    }

    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Ids in creation order.
    #[must_use]
    pub fn ids(&self) -> Vec<StrokeId> {
        self.strokes.iter().map(|s| s.id).collect()
    }

    /// Number of strokes currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    /// Returns `true` if the store contains no strokes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    fn position(&self, id: StrokeId) -> Option<usize> {
        self.strokes.iter().position(|s| s.id == id)
    }
}
