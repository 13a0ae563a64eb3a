//! Stroke REST routes.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use canvas::camera::Point;
use canvas::consts::DEFAULT_STROKE_COLOR;
use canvas::doc::{Stroke, StrokeId};
use serde::Deserialize;

use super::{BoardQuery, require_board, store_error_to_status};
use crate::services::board;
use crate::state::AppState;

#[cfg(test)]
#[path = "strokes_test.rs"]
mod strokes_test;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStrokeBody {
    pub board_id: Option<String>,
    pub path: Option<Vec<Point>>,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    DEFAULT_STROKE_COLOR.to_owned()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteStrokeQuery {
    pub stroke_id: Option<StrokeId>,
    pub board_id: Option<String>,
}

/// `GET /strokes?boardId=`: the board's strokes, oldest first.
pub async fn list_strokes(
    State(state): State<AppState>,
    Query(query): Query<BoardQuery>,
) -> Result<Json<Vec<Stroke>>, StatusCode> {
    let board = require_board(query.board_id.as_deref())?;
    let strokes = state.store.list_strokes(&board).await.map_err(store_error_to_status)?;
    Ok(Json(strokes))
}

/// `POST /strokes`: persist a stroke and relay it to the board.
pub async fn create_stroke(
    State(state): State<AppState>,
    Json(body): Json<CreateStrokeBody>,
) -> Result<Json<Stroke>, StatusCode> {
    let board_id = require_board(body.board_id.as_deref())?;
    let path = body.path.filter(|p| !p.is_empty()).ok_or(StatusCode::BAD_REQUEST)?;
    if body.color.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let stroke = board::create_stroke(&state, &board_id, path, body.color)
        .await
        .map_err(store_error_to_status)?;
    Ok(Json(stroke))
}

/// `DELETE /strokes?strokeId=&boardId=`: remove a stroke and relay the erase.
pub async fn delete_stroke(
    State(state): State<AppState>,
    Query(query): Query<DeleteStrokeQuery>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let board_id = require_board(query.board_id.as_deref())?;
    let stroke_id = query.stroke_id.ok_or(StatusCode::BAD_REQUEST)?;
    board::delete_stroke(&state, &board_id, stroke_id)
        .await
        .map_err(store_error_to_status)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
