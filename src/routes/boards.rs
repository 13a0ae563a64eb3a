//! Board code routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use canvas::doc::BoardId;
use serde::Serialize;

use super::store_error_to_status;
use crate::services::board;
use crate::state::AppState;

#[cfg(test)]
#[path = "boards_test.rs"]
mod boards_test;

#[derive(Debug, Serialize)]
pub struct GeneratedId {
    pub id: BoardId,
}

#[derive(Debug, Serialize)]
pub struct BoardInfo {
    pub id: BoardId,
    /// False until the first stroke is posted.
    pub exists: bool,
}

/// `GET /generate-id`: a fresh, unused board code.
pub async fn generate_id(State(state): State<AppState>) -> Result<Json<GeneratedId>, StatusCode> {
    let id = board::generate_board_id(&state).await.map_err(store_error_to_status)?;
    Ok(Json(GeneratedId { id }))
}

/// `GET /board/{id}`: validate a board code. Malformed codes are not found.
pub async fn board_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BoardInfo>, StatusCode> {
    let id = BoardId::parse(&id).map_err(|_| StatusCode::NOT_FOUND)?;
    let exists = state.store.board_exists(&id).await.map_err(store_error_to_status)?;
    Ok(Json(BoardInfo { id, exists }))
}
