//! REST endpoints for one-to-one conversations between a user and a donor.
//!
//! A conversation is identified by its member pair regardless of order, so
//! asking for (a, b) and (b, a) yields the same record.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::db::store;
use crate::routes::MessageResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMembers {
    pub user_id: Option<String>,
    pub donor_id: Option<String>,
}

impl ConversationMembers {
    fn pair(self) -> Option<(String, String)> {
        match (self.user_id, self.donor_id) {
            (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => Some((a, b)),
            _ => None,
        }
    }
}

/// POST /conversations — Create or get the conversation between two members.
/// Body: { "userId": "...", "donorId": "..." }.
/// Returns 200 with the existing conversation, or 201 with a new one.
pub async fn create_conversation(
    State(state): State<AppState>,
    Json(body): Json<ConversationMembers>,
) -> Response {
    let Some((user_id, donor_id)) = body.pair() else {
        return (
            StatusCode::BAD_REQUEST,
            MessageResponse::json("userId and donorId are required"),
        )
            .into_response();
    };

    let db = state.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        store::find_or_create_conversation(&conn, &user_id, &donor_id).map_err(StatusCode::from)
    })
    .await
    .unwrap_or(Err(StatusCode::INTERNAL_SERVER_ERROR));

    match result {
        Ok((conversation, true)) => {
            tracing::info!(conversation_id = %conversation.id, "Conversation created");
            (StatusCode::CREATED, Json(conversation)).into_response()
        }
        Ok((conversation, false)) => (StatusCode::OK, Json(conversation)).into_response(),
        Err(status) => (status, MessageResponse::json("Error creating conversation.")).into_response(),
    }
}

/// GET /conversations?userId=...&donorId=... — Look up an existing conversation.
pub async fn get_conversation(
    State(state): State<AppState>,
    Query(query): Query<ConversationMembers>,
) -> Response {
    let Some((user_id, donor_id)) = query.pair() else {
        return (
            StatusCode::BAD_REQUEST,
            MessageResponse::json("userId and donorId are required"),
        )
            .into_response();
    };

    let db = state.db.clone();
    let result = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        store::find_conversation(&conn, &user_id, &donor_id).map_err(StatusCode::from)
    })
    .await
    .unwrap_or(Err(StatusCode::INTERNAL_SERVER_ERROR));

    match result {
        Ok(Some(conversation)) => (StatusCode::OK, Json(conversation)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            MessageResponse::json("No conversation found"),
        )
            .into_response(),
        Err(status) => (status, MessageResponse::json("Error fetching conversation.")).into_response(),
    }
}
