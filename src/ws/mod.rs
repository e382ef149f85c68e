//! Real-time presence and direct-message relay.
//!
//! ```text
//! /ws upgrade (handler)
//!   → run_connection (actor): reader loop, writer task, keepalive
//!     → Gateway::on_connect            → Session { Connected }
//!     → addUser     → Gateway::on_handshake  → PresenceRegistry::add + broadcast getUsers
//!     → sendMessage → Gateway::on_send_message → relay (lookup + getMessage)
//!     → close/error → Gateway::on_disconnect → PresenceRegistry::remove + broadcast getUsers
//! ```

pub mod actor;
pub mod broadcast;
pub mod gateway;
pub mod handler;
pub mod presence;
pub mod protocol;
pub mod relay;
pub mod session;

use tokio::sync::mpsc;

pub use gateway::Gateway;
pub use presence::{PresenceEntry, PresenceRegistry};
pub use session::{Session, SessionState};

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// Server-assigned, monotonically increasing connection identifier.
pub type ConnectionId = u64;

/// Opaque reference to one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub tx: ConnectionSender,
}
