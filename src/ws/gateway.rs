//! Connection gateway: owns the table of open connections and the presence
//! registry, and wires each session's events to them.
//!
//! Membership changes (handshake, disconnect) are applied and broadcast under
//! one lock, so every client sees presence snapshots in the order the changes
//! happened. The lock is never held across an await.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use super::broadcast::broadcast_to_all;
use super::presence::{PresenceEntry, PresenceRegistry};
use super::protocol::{Handshake, PresenceView, SendMessage, ServerEvent};
use super::relay::{relay, OutboundMessage, RelayOutcome};
use super::session::{Session, SessionState};
use super::{ConnectionHandle, ConnectionId, ConnectionSender};
use crate::db::{store, DbPool};

pub struct Gateway {
    connections: DashMap<ConnectionId, ConnectionSender>,
    presence: PresenceRegistry,
    membership: Mutex<()>,
    next_id: AtomicU64,
    /// Used to persist relayed messages that name a conversation.
    db: Option<DbPool>,
}

impl Gateway {
    /// A gateway that relays only, without persisting anything.
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            presence: PresenceRegistry::new(),
            membership: Mutex::new(()),
            next_id: AtomicU64::new(1),
            db: None,
        }
    }

    /// A gateway that also persists relayed messages carrying a conversationId.
    pub fn with_store(db: DbPool) -> Self {
        Self {
            db: Some(db),
            ..Self::new()
        }
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Register a new connection and return its session in `Connected` state.
    pub fn on_connect(&self, tx: ConnectionSender) -> Session {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections.insert(id, tx.clone());

        tracing::info!(
            connection_id = id,
            connections = self.connections.len(),
            "Connection opened"
        );

        Session::new(ConnectionHandle { id, tx })
    }

    /// Register the session under the handshake identity and push the new
    /// snapshot to every connection. Returns true when the session is now
    /// registered.
    ///
    /// An identity already held by another connection is refused and the
    /// session stays `Connected`, so it may handshake again once the holder
    /// is gone. Repeat handshakes on an identified session are ignored.
    pub fn on_handshake(&self, session: &mut Session, handshake: Handshake) -> bool {
        if session.state() != SessionState::Connected {
            tracing::debug!(
                connection_id = session.id(),
                state = session.state().as_str(),
                uid = %handshake.uid,
                "Ignoring repeated handshake"
            );
            return false;
        }

        let _membership = self.membership.lock().unwrap_or_else(PoisonError::into_inner);

        let registered = self.presence.add(PresenceEntry {
            uid: handshake.uid.clone(),
            connection: session.handle().clone(),
            profile: handshake.profile,
        });

        if registered {
            session.identify(&handshake.uid);
            tracing::info!(connection_id = session.id(), uid = %handshake.uid, "User online");
        } else {
            tracing::info!(
                connection_id = session.id(),
                uid = %handshake.uid,
                "Identity already connected elsewhere; keeping first connection"
            );
        }

        self.broadcast_snapshot();
        registered
    }

    /// Relay a message from this session. If the message names a
    /// conversation it is persisted first; a storage failure is logged and
    /// does not stop the relay.
    pub async fn on_send_message(
        &self,
        session: &Session,
        message: SendMessage,
    ) -> Option<RelayOutcome> {
        let Some(sender) = session.uid().map(str::to_string) else {
            tracing::warn!(
                connection_id = session.id(),
                recipient = %message.receiver_id,
                "Dropping sendMessage from connection without handshake"
            );
            return None;
        };

        if let (Some(db), Some(conversation_id)) = (&self.db, &message.conversation_id) {
            persist(db, conversation_id, &sender, &message.payload).await;
        }

        Some(relay(
            &self.presence,
            OutboundMessage {
                recipient: message.receiver_id,
                sender,
                payload: message.payload,
            },
        ))
    }

    /// Close the session, drop its registration and push the new snapshot to
    /// the remaining connections. Safe to call more than once.
    pub fn on_disconnect(&self, session: &mut Session) {
        if !session.close() {
            return;
        }

        let _membership = self.membership.lock().unwrap_or_else(PoisonError::into_inner);

        self.connections.remove(&session.id());
        let removed = self.presence.remove(session.id());

        tracing::info!(
            connection_id = session.id(),
            uid = ?removed.as_ref().map(|e| e.uid.as_str()),
            connections = self.connections.len(),
            "Connection closed"
        );

        self.broadcast_snapshot();
    }

    /// Push the full presence snapshot to every open connection.
    fn broadcast_snapshot(&self) {
        let users: Vec<PresenceView> = self
            .presence
            .snapshot()
            .iter()
            .map(PresenceView::from)
            .collect();
        broadcast_to_all(&self.connections, &ServerEvent::PresenceUpdate(users));
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

async fn persist(db: &DbPool, conversation_id: &str, sender: &str, payload: &serde_json::Value) {
    let db = db.clone();
    let conversation_id = conversation_id.to_string();
    let sender = sender.to_string();
    let payload = payload.clone();

    let result = tokio::task::spawn_blocking(move || {
        let conn = db.lock().unwrap_or_else(PoisonError::into_inner);
        store::append_message(&conn, &conversation_id, &sender, &payload)
    })
    .await;

    match result {
        Ok(Ok(stored)) => {
            tracing::debug!(
                message_id = %stored.id,
                conversation_id = %stored.conversation_id,
                "Relayed message persisted"
            );
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Failed to persist relayed message");
        }
        Err(e) => {
            tracing::error!(error = %e, "Persistence task failed");
        }
    }
}
