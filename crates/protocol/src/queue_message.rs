//! Queue messages
//!
//! The internal+wire representation of an accepted chat message. Built by
//! the ingress (new UUID, server-side timestamp) and carried unchanged
//! through the external queue, the broadcaster, and the batch writer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ChatFrame, MessageKind};

/// A message accepted for ordered delivery.
///
/// `message_id` is globally unique (UUIDv4) and is the deduplication key
/// everywhere: the external queue's dedup id, and the conflict target of
/// the database insert. `timestamp` is the ingress server's clock, ISO-8601,
/// monotonic per node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    #[serde(rename = "messageId")]
    pub message_id: String,

    #[serde(rename = "roomId")]
    pub room_id: u32,

    #[serde(rename = "userId")]
    pub user_id: String,

    pub username: String,

    pub message: String,

    /// Server receive time, ISO-8601.
    pub timestamp: String,

    #[serde(rename = "messageType")]
    pub message_type: MessageKind,

    /// Node that accepted the message.
    #[serde(rename = "serverId")]
    pub server_id: String,

    #[serde(rename = "clientIp")]
    pub client_ip: String,
}

impl QueueMessage {
    /// Build a queue message from a validated ingress frame.
    pub fn from_frame(frame: &ChatFrame, room_id: u32, server_id: &str, client_ip: &str) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            room_id,
            user_id: frame.user_id.clone(),
            username: frame.username.clone(),
            message: frame.message.clone(),
            timestamp: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            message_type: frame.message_type,
            server_id: server_id.to_string(),
            client_ip: client_ip.to_string(),
        }
    }

    /// Parse a queue message from its wire JSON.
    pub fn from_json(text: &str) -> Result<Self, crate::ProtocolError> {
        serde_json::from_str(text).map_err(crate::ProtocolError::Parse)
    }

    /// Serialize to wire JSON.
    ///
    /// Serialization of this type cannot fail (no non-string map keys, no
    /// non-finite floats), so this returns the document directly.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// The timestamp parsed to an instant, for the persistence boundary.
    ///
    /// Falls back to now when the stored string does not parse; a message
    /// that made it this far has already been validated once, so this only
    /// covers foreign producers with sloppy clocks.
    pub fn timestamp_as_instant(&self) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> ChatFrame {
        ChatFrame {
            user_id: "42".into(),
            username: "alice".into(),
            message: "hi".into(),
            timestamp: "2025-01-01T00:00:00Z".into(),
            message_type: MessageKind::Text,
        }
    }

    #[test]
    fn from_frame_generates_uuid_and_server_fields() {
        let msg = QueueMessage::from_frame(&sample_frame(), 5, "node-a", "10.0.0.1");
        assert_eq!(msg.room_id, 5);
        assert_eq!(msg.server_id, "node-a");
        assert_eq!(msg.client_ip, "10.0.0.1");
        assert!(Uuid::parse_str(&msg.message_id).is_ok());
        // Server timestamp replaces the client one.
        assert_ne!(msg.timestamp, "2025-01-01T00:00:00Z");
    }

    #[test]
    fn distinct_messages_get_distinct_ids() {
        let frame = sample_frame();
        let a = QueueMessage::from_frame(&frame, 1, "n", "ip");
        let b = QueueMessage::from_frame(&frame, 1, "n", "ip");
        assert_ne!(a.message_id, b.message_id);
    }

    #[test]
    fn wire_round_trip() {
        let msg = QueueMessage::from_frame(&sample_frame(), 7, "node-b", "192.168.1.9");
        let parsed = QueueMessage::from_json(&msg.to_json()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn timestamp_parses_to_instant() {
        let mut msg = QueueMessage::from_frame(&sample_frame(), 1, "n", "ip");
        msg.timestamp = "2025-06-15T12:30:00Z".into();
        let instant = msg.timestamp_as_instant();
        assert_eq!(instant.to_rfc3339_opts(chrono::SecondsFormat::Secs, true), "2025-06-15T12:30:00Z");
    }

    #[test]
    fn unparseable_timestamp_falls_back_to_now() {
        let mut msg = QueueMessage::from_frame(&sample_frame(), 1, "n", "ip");
        msg.timestamp = "not-a-time".into();
        let before = Utc::now();
        let instant = msg.timestamp_as_instant();
        assert!(instant >= before);
    }
}
