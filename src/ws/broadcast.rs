use axum::extract::ws::Message;
use dashmap::DashMap;

use super::protocol::ServerEvent;
use super::{ConnectionId, ConnectionSender};

/// Encode a server event as a JSON text frame.
pub fn encode(event: &ServerEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode server event");
            None
        }
    }
}

/// Send a server event to one connection.
/// Returns false if the connection's writer has already gone away.
pub fn send_to_connection(tx: &ConnectionSender, event: &ServerEvent) -> bool {
    match encode(event) {
        Some(msg) => tx.send(msg).is_ok(),
        None => false,
    }
}

/// Broadcast a server event to every open connection.
pub fn broadcast_to_all(connections: &DashMap<ConnectionId, ConnectionSender>, event: &ServerEvent) {
    let Some(msg) = encode(event) else {
        return;
    };

    for entry in connections.iter() {
        let _ = entry.value().send(msg.clone());
    }
}
