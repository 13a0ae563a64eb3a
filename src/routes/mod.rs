//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! REST endpoints persist and list strokes; `/ws` streams the relay for one
//! board as binary frames. Every route shares the same `AppState`.

pub mod boards;
pub mod strokes;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use canvas::doc::BoardId;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::services::persistence::StoreError;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/strokes",
            get(strokes::list_strokes)
                .post(strokes::create_stroke)
                .delete(strokes::delete_stroke),
        )
        .route("/generate-id", get(boards::generate_id))
        .route("/board/{id}", get(boards::board_info))
        .route("/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// `?boardId=` query shared by the stroke list and the relay socket.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardQuery {
    pub board_id: Option<String>,
}

/// Missing or malformed board codes are a client error.
pub(crate) fn require_board(raw: Option<&str>) -> Result<BoardId, StatusCode> {
    let raw = raw.ok_or(StatusCode::BAD_REQUEST)?;
    BoardId::parse(raw).map_err(|_| StatusCode::BAD_REQUEST)
}

pub(crate) fn store_error_to_status(err: StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Database(e) => {
            error!(error = %e, "store operation failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
