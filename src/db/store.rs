//! Persistence operations for users, donors, conversations and messages.
//!
//! Every function takes a borrowed `rusqlite::Connection` and is synchronous.
//! Async callers lock the `DbPool` inside `tokio::task::spawn_blocking`.

use axum::http::StatusCode;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

use crate::db::models::{Conversation, ProfileFields, StoredMessage, UserProfile};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<StoreError> for StatusCode {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => StatusCode::NOT_FOUND,
            StoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            StoreError::Conflict(_) => StatusCode::CONFLICT,
            StoreError::Sqlite(e) => {
                tracing::error!(error = %e, "Storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            StoreError::Json(e) => {
                tracing::error!(error = %e, "Stored document could not be decoded");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Whether an upsert inserted a new row or updated an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn require(field: &str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

// --- Users ---

/// Insert or update a user profile keyed by uid.
pub fn upsert_user_profile(
    conn: &Connection,
    uid: &str,
    fields: &ProfileFields,
) -> Result<Upsert, StoreError> {
    require("uid", uid)?;
    let now = now_rfc3339();

    let exists = conn
        .query_row(
            "SELECT 1 FROM users WHERE uid = ?1",
            rusqlite::params![uid],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    if exists {
        conn.execute(
            "UPDATE users SET
                display_name = COALESCE(?2, display_name),
                photo_url = COALESCE(?3, photo_url),
                email = COALESCE(?4, email),
                phone_number = COALESCE(?5, phone_number),
                updated_at = ?6
             WHERE uid = ?1",
            rusqlite::params![
                uid,
                fields.display_name,
                fields.photo_url,
                fields.email,
                fields.phone_number,
                now,
            ],
        )?;
        Ok(Upsert::Updated)
    } else {
        conn.execute(
            "INSERT INTO users (uid, display_name, photo_url, email, phone_number, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            rusqlite::params![
                uid,
                fields.display_name,
                fields.photo_url,
                fields.email,
                fields.phone_number,
                now,
            ],
        )?;
        Ok(Upsert::Created)
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        uid: row.get(0)?,
        display_name: row.get(1)?,
        photo_url: row.get(2)?,
        email: row.get(3)?,
        phone_number: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

pub fn get_user_profile(conn: &Connection, uid: &str) -> Result<UserProfile, StoreError> {
    conn.query_row(
        "SELECT uid, display_name, photo_url, email, phone_number, created_at, updated_at
         FROM users WHERE uid = ?1",
        rusqlite::params![uid],
        user_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound)
}

pub fn list_user_profiles(conn: &Connection) -> Result<Vec<UserProfile>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT uid, display_name, photo_url, email, phone_number, created_at, updated_at
         FROM users ORDER BY created_at, uid",
    )?;
    let users = stmt
        .query_map([], user_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

// --- Donors ---

/// Store an opaque donor document. A fresh `id` is assigned unless the
/// document already carries a non-empty string `id`.
pub fn insert_donor(conn: &Connection, document: Value) -> Result<Value, StoreError> {
    let Value::Object(mut fields) = document else {
        return Err(StoreError::InvalidInput(
            "donor must be a JSON object".to_string(),
        ));
    };

    let id = match fields.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => uuid::Uuid::now_v7().to_string(),
    };
    fields.insert("id".to_string(), Value::String(id.clone()));

    let document = Value::Object(fields);
    conn.execute(
        "INSERT INTO donors (id, document, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![id, serde_json::to_string(&document)?, now_rfc3339()],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(format!("donor {} already exists", id))
        }
        other => StoreError::Sqlite(other),
    })?;

    Ok(document)
}

pub fn list_donors(conn: &Connection) -> Result<Vec<Value>, StoreError> {
    let mut stmt = conn.prepare("SELECT document FROM donors ORDER BY seq")?;
    let raw = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    raw.iter()
        .map(|doc| serde_json::from_str(doc).map_err(StoreError::from))
        .collect()
}

// --- Conversations ---

/// Normalize member order: lexicographically smaller uid is member_a.
fn normalize_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Find the conversation between exactly these two members, in either order.
pub fn find_conversation(
    conn: &Connection,
    member_a: &str,
    member_b: &str,
) -> Result<Option<Conversation>, StoreError> {
    let (a, b) = normalize_pair(member_a, member_b);
    let conversation = conn
        .query_row(
            "SELECT id, member_a, member_b, created_at FROM conversations
             WHERE member_a = ?1 AND member_b = ?2",
            rusqlite::params![a, b],
            |row| {
                Ok(Conversation {
                    id: row.get(0)?,
                    members: [row.get(1)?, row.get(2)?],
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(conversation)
}

/// Return the existing conversation for this pair, or create one.
/// An existing match always takes precedence over creation.
/// The boolean is true when a new conversation was created.
pub fn find_or_create_conversation(
    conn: &Connection,
    member_a: &str,
    member_b: &str,
) -> Result<(Conversation, bool), StoreError> {
    require("userId", member_a)?;
    require("donorId", member_b)?;
    if member_a == member_b {
        return Err(StoreError::InvalidInput(
            "a conversation needs two distinct members".to_string(),
        ));
    }

    let (a, b) = normalize_pair(member_a, member_b);
    let inserted = conn.execute(
        "INSERT INTO conversations (id, member_a, member_b, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(member_a, member_b) DO NOTHING",
        rusqlite::params![uuid::Uuid::now_v7().to_string(), a, b, now_rfc3339()],
    )?;

    let conversation = find_conversation(conn, a, b)?.ok_or(StoreError::NotFound)?;
    Ok((conversation, inserted > 0))
}

// --- Messages ---

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(StoredMessage, String)> {
    Ok((
        StoredMessage {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            sender_id: row.get(2)?,
            content: Value::Null,
            timestamp: row.get(4)?,
        },
        row.get(3)?,
    ))
}

/// Persist a message. The timestamp is assigned here, at write time.
pub fn append_message(
    conn: &Connection,
    conversation_id: &str,
    sender_id: &str,
    content: &Value,
) -> Result<StoredMessage, StoreError> {
    require("conversationId", conversation_id)?;
    require("senderId", sender_id)?;

    let known = conn
        .query_row(
            "SELECT 1 FROM conversations WHERE id = ?1",
            rusqlite::params![conversation_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !known {
        return Err(StoreError::NotFound);
    }

    let message = StoredMessage {
        id: uuid::Uuid::now_v7().to_string(),
        conversation_id: conversation_id.to_string(),
        sender_id: sender_id.to_string(),
        content: content.clone(),
        timestamp: now_rfc3339(),
    };

    conn.execute(
        "INSERT INTO messages (id, conversation_id, sender_id, content, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            message.id,
            message.conversation_id,
            message.sender_id,
            serde_json::to_string(&message.content)?,
            message.timestamp,
        ],
    )?;

    Ok(message)
}

/// All messages of a conversation in write order. Unknown conversations
/// simply have no messages.
pub fn list_messages(
    conn: &Connection,
    conversation_id: &str,
) -> Result<Vec<StoredMessage>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, sender_id, content, timestamp
         FROM messages WHERE conversation_id = ?1 ORDER BY seq",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![conversation_id], message_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(mut message, raw)| {
            message.content = serde_json::from_str(&raw)?;
            Ok::<_, StoreError>(message)
        })
        .collect()
}
