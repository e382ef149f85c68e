//! Presence registry: which identity is reachable through which connection.
//!
//! At most one entry per identity. The first registration wins until its
//! connection disconnects; removal is keyed by connection, never by identity,
//! so a stale connection can never evict a newer one.

use serde_json::{Map, Value};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{ConnectionHandle, ConnectionId};

/// One registered identity and the connection it is reachable on.
#[derive(Debug, Clone)]
pub struct PresenceEntry {
    pub uid: String,
    pub connection: ConnectionHandle,
    /// Profile fields from the handshake, carried opaquely.
    pub profile: Map<String, Value>,
}

/// Insertion-ordered presence set. All operations take the same lock, so
/// connects, disconnects and relay lookups are serialized against each other.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    entries: Mutex<Vec<PresenceEntry>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<PresenceEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert the entry unless its identity is already registered.
    /// Returns false (and changes nothing) on a duplicate identity.
    pub fn add(&self, entry: PresenceEntry) -> bool {
        let mut entries = self.entries();
        if entries.iter().any(|e| e.uid == entry.uid) {
            return false;
        }
        entries.push(entry);
        true
    }

    /// Remove the entry owned by this connection, if any.
    pub fn remove(&self, connection_id: ConnectionId) -> Option<PresenceEntry> {
        let mut entries = self.entries();
        let index = entries
            .iter()
            .position(|e| e.connection.id == connection_id)?;
        Some(entries.remove(index))
    }

    /// Current entry for an identity. `None` means the user is offline.
    pub fn lookup(&self, uid: &str) -> Option<PresenceEntry> {
        self.entries().iter().find(|e| e.uid == uid).cloned()
    }

    /// All entries in insertion order.
    pub fn snapshot(&self) -> Vec<PresenceEntry> {
        self.entries().clone()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
