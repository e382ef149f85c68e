pub mod migrations;
pub mod models;
pub mod store;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// The single SQLite connection shared by REST handlers and the gateway.
/// Callers lock it from `spawn_blocking` and never across an await.
pub type DbPool = Arc<Mutex<Connection>>;

/// Open `<data_dir>/donation.db`, creating the directory and file on first
/// start, and bring the schema up to date.
pub fn init_db(data_dir: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(data_dir)?;

    let db_path = Path::new(data_dir).join("donation.db");
    let mut conn = Connection::open(&db_path)?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    // messages.conversation_id references conversations.id
    conn.pragma_update(None, "foreign_keys", "ON")?;

    migrations::migrations().to_latest(&mut conn)?;

    tracing::info!(path = %db_path.display(), "Donation store ready");

    Ok(Arc::new(Mutex::new(conn)))
}
