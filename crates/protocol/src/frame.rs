//! Inbound chat frames
//!
//! A [`ChatFrame`] is the JSON document a client submits over its socket.
//! Frames are parsed and validated by the ingress before anything else
//! touches them; once constructed they are never mutated.

use serde::{Deserialize, Serialize};

/// Kind of chat frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    /// Ordinary chat text.
    Text,
    /// User joined the room.
    Join,
    /// User left the room.
    Leave,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MessageKind::Text => "TEXT",
            MessageKind::Join => "JOIN",
            MessageKind::Leave => "LEAVE",
        };
        f.write_str(s)
    }
}

/// A single client-submitted frame.
///
/// Field names mirror the wire JSON exactly. `user_id` is a numeric string
/// on the wire; range checking happens in [`crate::validate_frame`], not
/// during deserialization, so a malformed value produces a protocol-level
/// error response instead of a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFrame {
    #[serde(rename = "userId")]
    pub user_id: String,

    pub username: String,

    pub message: String,

    /// Client-side submission time, ISO-8601.
    pub timestamp: String,

    #[serde(rename = "messageType")]
    pub message_type: MessageKind,
}

impl ChatFrame {
    /// Parse a frame from raw JSON text.
    pub fn from_json(text: &str) -> Result<Self, crate::ProtocolError> {
        serde_json::from_str(text).map_err(crate::ProtocolError::Parse)
    }
}
