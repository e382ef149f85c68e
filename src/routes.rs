use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::config::Config;
use crate::dm::{conversations, messages};
use crate::donors::records as donors;
use crate::state::AppState;
use crate::users::profiles as users;
use crate::ws::handler as ws_handler;

/// `{ "message": "..." }` body used for status-style responses.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn json(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

/// CORS for the browser front-end. An unparseable origin disables
/// cross-origin access rather than failing startup.
fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match origin.parse::<HeaderValue>() {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            tracing::warn!(origin = %origin, "Invalid CORS origin, cross-origin requests disabled");
            layer
        }
    }
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState, config: &Config) -> Router {
    let user_routes = Router::new()
        .route("/user", axum::routing::post(users::upsert_user))
        .route("/users", axum::routing::get(users::list_users))
        .route("/users/{uid}", axum::routing::get(users::get_user));

    let donor_routes = Router::new()
        .route(
            "/donors",
            axum::routing::get(donors::list_donors).post(donors::create_donor),
        );

    let conversation_routes = Router::new()
        .route(
            "/conversations",
            axum::routing::post(conversations::create_conversation)
                .get(conversations::get_conversation),
        )
        .route("/messages", axum::routing::post(messages::send_message))
        .route(
            "/messages/{conversation_id}",
            axum::routing::get(messages::list_messages),
        );

    // Real-time presence and relay
    let ws_routes = Router::new().route("/ws", axum::routing::get(ws_handler::ws_upgrade));

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(user_routes)
        .merge(donor_routes)
        .merge(conversation_routes)
        .merge(ws_routes)
        .merge(health)
        .layer(DefaultBodyLimit::max(config.max_body_bytes()))
        .layer(cors_layer(&config.cors_origin))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
