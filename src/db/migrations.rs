use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Uses SQLite user_version pragma for tracking — no migration table needed.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(
            "-- Migration 1: Users and donors

-- User profiles keyed by the application-level uid
CREATE TABLE users (
    uid TEXT PRIMARY KEY,
    display_name TEXT,
    photo_url TEXT,
    email TEXT,
    phone_number TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Donor records are opaque JSON documents
CREATE TABLE donors (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    document TEXT NOT NULL,
    created_at TEXT NOT NULL
);
",
        ),
        M::up(
            "-- Migration 2: Conversations and messages

-- One-to-one conversations. Member order is normalized
-- (lexicographically smaller uid is always member_a).
CREATE TABLE conversations (
    id TEXT PRIMARY KEY,
    member_a TEXT NOT NULL,
    member_b TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(member_a, member_b)
);
CREATE INDEX idx_conversations_b ON conversations(member_b);

-- seq gives write order; timestamp is assigned at write time
CREATE TABLE messages (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    conversation_id TEXT NOT NULL,
    sender_id TEXT NOT NULL,
    content TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);
CREATE INDEX idx_messages_conversation ON messages(conversation_id, seq);
",
        ),
    ])
}
