//! Stroke persistence.
//!
//! DESIGN
//! ======
//! Handlers and services talk to a [`StrokeRepo`] trait object. Two backends
//! implement it: [`crate::db::PgStore`] for Postgres and [`MemoryStore`] for
//! local runs and tests. Both assign stroke ids from a single increasing
//! sequence and list a board's strokes in creation order.
//!
//! Boards are created lazily by the first stroke posted to them.

use std::collections::HashMap;

use canvas::camera::Point;
use canvas::doc::{BoardId, Stroke, StrokeId};
use tokio::sync::RwLock;

#[cfg(test)]
#[path = "persistence_test.rs"]
mod persistence_test;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("stroke not found: {0}")]
    NotFound(StrokeId),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait::async_trait]
pub trait StrokeRepo: Send + Sync {
    /// Strokes on `board`, oldest first. Unknown boards yield an empty list.
    async fn list_strokes(&self, board: &BoardId) -> Result<Vec<Stroke>, StoreError>;

    async fn board_exists(&self, board: &BoardId) -> Result<bool, StoreError>;

    /// Persist a stroke, creating `board` first if needed. Returns the stored
    /// stroke with its assigned id.
    async fn insert_stroke(&self, board: &BoardId, path: Vec<Point>, color: String) -> Result<Stroke, StoreError>;

    /// Remove stroke `id` from `board`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the board holds no such stroke.
    async fn delete_stroke(&self, board: &BoardId, id: StrokeId) -> Result<(), StoreError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

#[derive(Default)]
struct MemoryInner {
    last_id: StrokeId,
    boards: HashMap<BoardId, Vec<Stroke>>,
}

/// Process-local store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StrokeRepo for MemoryStore {
    async fn list_strokes(&self, board: &BoardId) -> Result<Vec<Stroke>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.boards.get(board).cloned().unwrap_or_default())
    }

    async fn board_exists(&self, board: &BoardId) -> Result<bool, StoreError> {
        Ok(self.inner.read().await.boards.contains_key(board))
    }

    async fn insert_stroke(&self, board: &BoardId, path: Vec<Point>, color: String) -> Result<Stroke, StoreError> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let stroke = Stroke { id: inner.last_id, path, color };
        inner.boards.entry(board.clone()).or_default().push(stroke.clone());
        Ok(stroke)
    }

    async fn delete_stroke(&self, board: &BoardId, id: StrokeId) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let strokes = inner.boards.get_mut(board).ok_or(StoreError::NotFound(id))?;
        let index = strokes.iter().position(|s| s.id == id).ok_or(StoreError::NotFound(id))?;
        strokes.remove(index);
        Ok(())
    }
}
