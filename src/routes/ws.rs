//! WebSocket handler: one-way board relay.
//!
//! DESIGN
//! ======
//! `/ws?boardId=` subscribes the socket to one board. Stroke and erase
//! events published by the REST routes are forwarded as binary frames
//! (see `frames::encode_event`). Writes never travel over this socket, so
//! inbound data frames are ignored.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → join the board's relay
//! 2. `select!` loop: relay events → socket; socket close/error → exit
//! 3. Exit → part the relay

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use canvas::doc::BoardId;
use tracing::{debug, info};

use super::{BoardQuery, require_board};
use crate::state::AppState;

#[cfg(test)]
#[path = "ws_test.rs"]
mod ws_test;

pub async fn handle_ws(
    State(state): State<AppState>,
    Query(query): Query<BoardQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let board = match require_board(query.board_id.as_deref()) {
        Ok(board) => board,
        Err(status) => return (status, "valid boardId required").into_response(),
    };
    ws.on_upgrade(move |socket| run_ws(socket, state, board))
}

async fn run_ws(mut socket: WebSocket, state: AppState, board: BoardId) {
    let (client_id, mut events) = state.relay.join(&board).await;
    info!(%client_id, board_id = %board, "ws: subscribed");

    loop {
        tokio::select! {
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            Some(event) = events.recv() => {
                let bytes = frames::encode_event(&event);
                if socket.send(Message::Binary(bytes.into())).await.is_err() {
                    debug!(%client_id, "ws: send failed");
                    break;
                }
            }
        }
    }

    state.relay.part(&board, client_id).await;
    info!(%client_id, board_id = %board, "ws: disconnected");
}
