//! REST endpoints for donor records. Donors are stored as opaque JSON
//! documents; the server only guarantees each one carries an `id`.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;

use crate::db::store;
use crate::state::AppState;

/// GET /donors — All donor documents in insertion order.
pub async fn list_donors(State(state): State<AppState>) -> Result<Json<Vec<Value>>, StatusCode> {
    let db = state.db.clone();

    let donors = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        store::list_donors(&conn).map_err(StatusCode::from)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    Ok(Json(donors))
}

/// POST /donors — Store a donor document. Body must be a JSON object.
pub async fn create_donor(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let db = state.db.clone();

    let donor = tokio::task::spawn_blocking(move || {
        let conn = db.lock().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        store::insert_donor(&conn, body).map_err(StatusCode::from)
    })
    .await
    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)??;

    tracing::debug!(donor_id = %donor["id"], "Donor stored");

    Ok((StatusCode::CREATED, Json(donor)))
}
