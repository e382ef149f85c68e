//! JSON event protocol spoken over `/ws`.
//!
//! Every frame is `{"event": <name>, "data": <payload>}`. Event names match the
//! browser client: `addUser` / `sendMessage` inbound, `getUsers` / `getMessage`
//! outbound.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::presence::PresenceEntry;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

/// Events a client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "addUser")]
    Handshake(Handshake),
    #[serde(rename = "sendMessage")]
    SendMessage(SendMessage),
}

/// Binds the connection to `uid`. Every other field is a profile field.
#[derive(Debug, Clone, Deserialize)]
pub struct Handshake {
    pub uid: String,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessage {
    #[serde(rename = "receiverId")]
    pub receiver_id: String,
    pub payload: Value,
    /// When present, the message is also persisted to this conversation.
    #[serde(rename = "conversationId", default)]
    pub conversation_id: Option<String>,
}

impl ClientEvent {
    /// Decode a text frame and check the fields the shape alone cannot.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let event: ClientEvent = serde_json::from_str(text)?;
        let missing = match &event {
            ClientEvent::Handshake(h) if h.uid.trim().is_empty() => Some("uid"),
            ClientEvent::SendMessage(m) if m.receiver_id.trim().is_empty() => Some("receiverId"),
            ClientEvent::SendMessage(m) if m.payload.is_null() => Some("payload"),
            _ => None,
        };
        match missing {
            Some(field) => Err(ProtocolError::MissingField(field)),
            None => Ok(event),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Handshake(_) => "addUser",
            ClientEvent::SendMessage(_) => "sendMessage",
        }
    }
}

/// Events the server pushes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Full presence snapshot, in registration order.
    #[serde(rename = "getUsers")]
    PresenceUpdate(Vec<PresenceView>),
    #[serde(rename = "getMessage")]
    DeliverMessage(Delivery),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceView {
    pub uid: String,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl From<&PresenceEntry> for PresenceView {
    fn from(entry: &PresenceEntry) -> Self {
        Self {
            uid: entry.uid.clone(),
            profile: entry.profile.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    #[serde(rename = "senderId")]
    pub sender_id: String,
    pub payload: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_handshake_keeps_profile_fields() {
        let text = json!({
            "event": "addUser",
            "data": {"uid": "alice", "displayName": "Alice", "photoURL": "http://x/a.png"}
        })
        .to_string();

        match ClientEvent::parse(&text).unwrap() {
            ClientEvent::Handshake(h) => {
                assert_eq!(h.uid, "alice");
                assert_eq!(h.profile["displayName"], "Alice");
                assert_eq!(h.profile["photoURL"], "http://x/a.png");
                assert!(!h.profile.contains_key("uid"));
            }
            other => panic!("Expected handshake, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_send_message() {
        let text = json!({
            "event": "sendMessage",
            "data": {"receiverId": "bob", "payload": {"text": "hi"}, "conversationId": "c1"}
        })
        .to_string();

        match ClientEvent::parse(&text).unwrap() {
            ClientEvent::SendMessage(m) => {
                assert_eq!(m.receiver_id, "bob");
                assert_eq!(m.payload, json!({"text": "hi"}));
                assert_eq!(m.conversation_id.as_deref(), Some("c1"));
            }
            other => panic!("Expected sendMessage, got: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_events_are_rejected() {
        let cases = [
            "not json".to_string(),
            json!({"event": "addUser", "data": {"displayName": "no uid"}}).to_string(),
            json!({"event": "addUser", "data": {"uid": ""}}).to_string(),
            json!({"event": "addUser", "data": {"uid": 42}}).to_string(),
            json!({"event": "sendMessage", "data": {"payload": "hi"}}).to_string(),
            json!({"event": "sendMessage", "data": {"receiverId": "bob"}}).to_string(),
            json!({"event": "sendMessage", "data": {"receiverId": "bob", "payload": null}})
                .to_string(),
            json!({"event": "deleteEverything", "data": {}}).to_string(),
        ];

        for text in &cases {
            assert!(ClientEvent::parse(text).is_err(), "accepted: {}", text);
        }
    }

    #[test]
    fn test_server_events_use_client_event_names() {
        let update = ServerEvent::PresenceUpdate(vec![PresenceView {
            uid: "alice".to_string(),
            profile: json!({"displayName": "Alice"}).as_object().cloned().unwrap(),
        }]);
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"event": "getUsers", "data": [{"uid": "alice", "displayName": "Alice"}]})
        );

        let delivery = ServerEvent::DeliverMessage(Delivery {
            sender_id: "alice".to_string(),
            payload: json!("hi"),
        });
        assert_eq!(
            serde_json::to_value(&delivery).unwrap(),
            json!({"event": "getMessage", "data": {"senderId": "alice", "payload": "hi"}})
        );
    }
}
