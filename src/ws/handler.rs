use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
};

use crate::state::AppState;
use crate::ws::actor;

/// GET /ws
/// WebSocket upgrade endpoint. Socket identities are not authenticated; a
/// client names itself with the `addUser` event after connecting.
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| actor::run_connection(socket, state))
}
