//! Board service: stroke writes with relay fan-out, and board code minting.
//!
//! DESIGN
//! ======
//! Every successful write is published to the board's relay subscribers
//! after it is persisted, so subscribers only ever see stored strokes with
//! server-assigned ids. Writers receive their own broadcast too; clients
//! dedup by stroke id.

use canvas::camera::Point;
use canvas::doc::{BoardId, Stroke, StrokeId};
use frames::BoardEvent;
use rand::Rng;
use tracing::info;

use crate::services::persistence::StoreError;
use crate::state::AppState;

#[cfg(test)]
#[path = "board_test.rs"]
mod board_test;

/// Characters a generated board code is drawn from.
pub const BOARD_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

/// Random code of `len` characters from [`BOARD_ID_ALPHABET`].
pub fn random_board_code<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(BOARD_ID_ALPHABET[rng.random_range(0..BOARD_ID_ALPHABET.len())]))
        .collect()
}

/// Mint a board code not yet used by any board.
///
/// Codes are redrawn until one is free; the board itself is only created
/// when its first stroke arrives.
///
/// # Errors
///
/// Returns a store error if the existence check fails.
pub async fn generate_board_id(state: &AppState) -> Result<BoardId, StoreError> {
    loop {
        let code = random_board_code(&mut rand::rng(), state.board_id_length);
        let Ok(board) = BoardId::parse(&code) else {
            continue;
        };
        if !state.store.board_exists(&board).await? {
            info!(board_id = %board, "board id generated");
            return Ok(board);
        }
    }
}

/// Persist a stroke and broadcast it to the board.
///
/// # Errors
///
/// Returns a store error if the insert fails; nothing is broadcast then.
pub async fn create_stroke(
    state: &AppState,
    board: &BoardId,
    path: Vec<Point>,
    color: String,
) -> Result<Stroke, StoreError> {
    let stroke = state.store.insert_stroke(board, path, color).await?;
    let subscribers = state.relay.publish(board, &BoardEvent::Stroke(stroke.clone())).await;
    info!(board_id = %board, stroke_id = stroke.id, points = stroke.path.len(), subscribers, "stroke created");
    Ok(stroke)
}

/// Delete a stroke and broadcast the erase to the board.
///
/// # Errors
///
/// [`StoreError::NotFound`] if the board holds no such stroke.
pub async fn delete_stroke(state: &AppState, board: &BoardId, id: StrokeId) -> Result<(), StoreError> {
    state.store.delete_stroke(board, id).await?;
    let subscribers = state.relay.publish(board, &BoardEvent::Erase { id }).await;
    info!(board_id = %board, stroke_id = id, subscribers, "stroke deleted");
    Ok(())
}
