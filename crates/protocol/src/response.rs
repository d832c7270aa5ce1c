//! Server-to-client responses
//!
//! Two response shapes go back on a session's write queue: a success ack
//! carrying the accepted message id and the echoed original frame, and an
//! error carrying a human-readable reason. Broadcast envelopes are not
//! responses — they are serialized [`crate::QueueMessage`] documents and
//! clients must treat them as a distinct frame kind.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::ChatFrame;

/// Ack or error returned to the submitting client.
///
/// The ack means "accepted by this node for ordered delivery"; it says
/// nothing about downstream fan-out having happened yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub status: String,

    #[serde(rename = "messageId", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    /// Ack acceptance time, ISO-8601.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(rename = "originalMessage", skip_serializing_if = "Option::is_none")]
    pub original_message: Option<ChatFrame>,

    /// Error emission time, ISO-8601.
    #[serde(rename = "serverTimestamp", skip_serializing_if = "Option::is_none")]
    pub server_timestamp: Option<String>,

    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl MessageResponse {
    /// Success ack for an accepted frame.
    pub fn success(message_id: &str, original: &ChatFrame) -> Self {
        Self {
            status: "SUCCESS".into(),
            message_id: Some(message_id.to_string()),
            timestamp: Some(Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
            original_message: Some(original.clone()),
            server_timestamp: None,
            error_message: None,
        }
    }

    /// Error response with a human-readable reason.
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: "ERROR".into(),
            message_id: None,
            timestamp: None,
            original_message: None,
            server_timestamp: Some(Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
            error_message: Some(reason.into()),
        }
    }

    /// Serialize to wire JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
