/// Database row types.
/// These correspond 1:1 to the SQLite schema defined in migrations.rs and
/// serialize with the camelCase field names the front-end expects.
use serde::{Deserialize, Serialize};

/// User profile in the users table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Mutable profile fields accepted by an upsert.
/// A `None` field leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
}

/// One-to-one conversation. `members` is always in normalized order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub members: [String; 2],
    pub created_at: String,
}

/// Persisted message. `content` is opaque JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: serde_json::Value,
    pub timestamp: String,
}
