//! REST endpoints for persisting and retrieving conversation messages.
//!
//! Persistence is independent of live relay: a message stored here is not
//! pushed over `/ws`, and a relayed message is only stored when the client
//! names its conversation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::db::models::StoredMessage;
use crate::db::store;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendMessageRequest {
    pub conversation_id: String,
    pub sender_id: String,
    pub content: Value,
}

/// POST /messages — Append a message to a conversation.
/// Body: { "conversationId": "...", "senderId": "...", "content": <any JSON> }.
/// The timestamp is assigned by the server at write time.
pub async fn send_message(
    State(state): State<AppState>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<StoredMessage>), StatusCode> {
    if body.content.is_null() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let db = state.db.clone();

    let message = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        store::append_message(&conn, &body.conversation_id, &body.sender_id, &body.content)
            .map_err(StatusCode::from)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    tracing::debug!(
        message_id = %message.id,
        conversation_id = %message.conversation_id,
        "Message stored"
    );

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /messages/{conversation_id} — All messages of a conversation, oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<StoredMessage>>, StatusCode> {
    let db = state.db.clone();

    let messages = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        store::list_messages(&conn, &conversation_id).map_err(StatusCode::from)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(messages))
}
