//! Frame validation
//!
//! All rules must hold or the frame is rejected with the first failing
//! reason as a human-readable message, which the ingress echoes back to the
//! client verbatim.

use chrono::DateTime;

use crate::ChatFrame;

const MIN_USER_ID: i64 = 1;
const MAX_USER_ID: i64 = 100_000;
const MIN_USERNAME_LEN: usize = 3;
const MAX_USERNAME_LEN: usize = 20;
const MIN_MESSAGE_LEN: usize = 1;
const MAX_MESSAGE_LEN: usize = 500;

/// A frame rejected by validation, with the reason sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Validate an ingress frame, returning the first failing rule.
pub fn validate_frame(frame: &ChatFrame) -> Result<(), ValidationError> {
    let user_id = frame.user_id.trim();
    if user_id.is_empty() {
        return Err(ValidationError::new("userId is required"));
    }
    match user_id.parse::<i64>() {
        Ok(id) if (MIN_USER_ID..=MAX_USER_ID).contains(&id) => {}
        Ok(_) => {
            return Err(ValidationError::new(format!(
                "userId must be between {MIN_USER_ID} and {MAX_USER_ID}"
            )))
        }
        Err(_) => return Err(ValidationError::new("userId must be a valid number")),
    }

    if frame.username.trim().is_empty() {
        return Err(ValidationError::new("username is required"));
    }
    let username_len = frame.username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&username_len) {
        return Err(ValidationError::new(format!(
            "username must be {MIN_USERNAME_LEN}-{MAX_USERNAME_LEN} characters"
        )));
    }
    if !frame.username.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::new("username must be alphanumeric"));
    }

    let message_len = frame.message.chars().count();
    if !(MIN_MESSAGE_LEN..=MAX_MESSAGE_LEN).contains(&message_len) {
        return Err(ValidationError::new(format!(
            "message must be {MIN_MESSAGE_LEN}-{MAX_MESSAGE_LEN} characters"
        )));
    }

    if frame.timestamp.trim().is_empty() {
        return Err(ValidationError::new("timestamp is required"));
    }
    if DateTime::parse_from_rfc3339(&frame.timestamp).is_err() {
        return Err(ValidationError::new("timestamp must be valid ISO-8601 format"));
    }

    // message_type is enforced by deserialization; an unknown kind never
    // reaches this function.
    Ok(())
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod validate_test;
