//! REST endpoints for user profiles.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::db::models::{ProfileFields, UserProfile};
use crate::db::store::{self, Upsert};
use crate::routes::MessageResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpsertUserRequest {
    pub uid: Option<String>,
    #[serde(flatten)]
    pub fields: ProfileFields,
}

/// POST /user — Create or update a profile keyed by uid.
/// Returns 201 when the profile was created, 200 when it was updated.
pub async fn upsert_user(
    State(state): State<AppState>,
    Json(body): Json<UpsertUserRequest>,
) -> (StatusCode, Json<MessageResponse>) {
    let uid = match body.uid {
        Some(uid) if !uid.trim().is_empty() => uid,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                MessageResponse::json("User ID (uid) is required"),
            )
        }
    };

    let db = state.db.clone();
    let fields = body.fields;
    let result = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        store::upsert_user_profile(&conn, &uid, &fields).map_err(StatusCode::from)
    })
    .await
    .unwrap_or(Err(StatusCode::INTERNAL_SERVER_ERROR));

    match result {
        Ok(Upsert::Created) => (
            StatusCode::CREATED,
            MessageResponse::json("User created successfully"),
        ),
        Ok(Upsert::Updated) => (
            StatusCode::OK,
            MessageResponse::json("User updated successfully"),
        ),
        Err(status) => (status, MessageResponse::json("Error creating/updating user")),
    }
}

/// GET /users — All user profiles.
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserProfile>>, StatusCode> {
    let db = state.db.clone();

    let users = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        store::list_user_profiles(&conn).map_err(StatusCode::from)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(users))
}

/// GET /users/{uid} — One profile, or 404.
pub async fn get_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<UserProfile>, StatusCode> {
    let db = state.db.clone();

    let user = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        store::get_user_profile(&conn, &uid).map_err(StatusCode::from)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(user))
}
