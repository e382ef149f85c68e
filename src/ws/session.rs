//! Lifecycle of one live connection.
//!
//! `Connected` → `Identified` on the first valid handshake, and either state
//! → `Closed` on transport disconnect. There is no way back out of `Closed`;
//! a reconnect is a new session.

use super::{ConnectionHandle, ConnectionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connected,
    Identified,
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Identified => "identified",
            Self::Closed => "closed",
        }
    }
}

#[derive(Debug)]
pub struct Session {
    handle: ConnectionHandle,
    state: SessionState,
    uid: Option<String>,
}

impl Session {
    pub fn new(handle: ConnectionHandle) -> Self {
        Self {
            handle,
            state: SessionState::Connected,
            uid: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Identity bound by the handshake, if one was received.
    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    /// Bind an identity. Only allowed once, from `Connected`.
    /// Returns false when the transition is not allowed.
    pub fn identify(&mut self, uid: &str) -> bool {
        if self.state != SessionState::Connected {
            return false;
        }
        self.uid = Some(uid.to_string());
        self.state = SessionState::Identified;
        true
    }

    /// Mark the session closed. Returns false if it already was.
    pub fn close(&mut self) -> bool {
        if self.state == SessionState::Closed {
            return false;
        }
        self.state = SessionState::Closed;
        true
    }
}
