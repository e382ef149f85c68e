//! Best-effort, at-most-once forwarding of a direct message to the
//! recipient's current connection. Undelivered messages are not queued.

use serde_json::Value;

use super::broadcast::send_to_connection;
use super::presence::PresenceRegistry;
use super::protocol::{Delivery, ServerEvent};
use super::ConnectionId;

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub recipient: String,
    pub sender: String,
    pub payload: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Handed to the recipient's writer. No acknowledgement is awaited.
    Delivered(ConnectionId),
    /// Recipient offline, or its connection closed before the hand-off.
    Unreachable,
}

/// Resolve the recipient and forward the payload as a `getMessage` event.
pub fn relay(presence: &PresenceRegistry, message: OutboundMessage) -> RelayOutcome {
    let Some(entry) = presence.lookup(&message.recipient) else {
        tracing::warn!(
            sender = %message.sender,
            recipient = %message.recipient,
            "Recipient unreachable: not connected"
        );
        return RelayOutcome::Unreachable;
    };

    let event = ServerEvent::DeliverMessage(Delivery {
        sender_id: message.sender.clone(),
        payload: message.payload,
    });

    if send_to_connection(&entry.connection.tx, &event) {
        tracing::debug!(
            sender = %message.sender,
            recipient = %message.recipient,
            connection_id = entry.connection.id,
            "Message relayed"
        );
        RelayOutcome::Delivered(entry.connection.id)
    } else {
        tracing::warn!(
            sender = %message.sender,
            recipient = %message.recipient,
            connection_id = entry.connection.id,
            "Recipient unreachable: connection closing"
        );
        RelayOutcome::Unreachable
    }
}
