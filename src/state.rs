use std::sync::Arc;

use crate::config::RealtimeConfig;
use crate::db::DbPool;
use crate::ws::Gateway;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// Open WebSocket connections and the presence registry
    pub gateway: Arc<Gateway>,
    /// Keepalive settings for WebSocket connections
    pub realtime: RealtimeConfig,
}

impl AppState {
    pub fn new(db: DbPool, realtime: RealtimeConfig) -> Self {
        Self {
            gateway: Arc::new(Gateway::with_store(db.clone())),
            db,
            realtime,
        }
    }
}
