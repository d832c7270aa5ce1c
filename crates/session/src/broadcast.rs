//! Room broadcaster
//!
//! Fans a queue message out to every live session in its room on this
//! node. The payload is serialized once; each recipient gets the same
//! string through the write serializer. Delivery is best-effort: the
//! sender was acked at ingress and the message is persisted independently,
//! so a slow or dead recipient is bounded loss, never a retry.

use std::sync::Arc;

use roomcast_protocol::QueueMessage;

use crate::{BroadcastMetrics, RoomRegistry, WriteSerializer};

/// Result of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Recipients whose queue accepted the frame
    pub success: usize,

    /// Recipients skipped as dead or dropped by backpressure
    pub failures: usize,
}

/// Per-room fan-out of queue messages.
pub struct Broadcaster {
    registry: Arc<RoomRegistry>,
    writer: Arc<WriteSerializer>,
    exclude_sender: bool,
    metrics: Arc<BroadcastMetrics>,
}

impl Broadcaster {
    /// Create a broadcaster.
    ///
    /// With `exclude_sender`, sessions whose recorded user id equals the
    /// message's sender are skipped; the reference deployment leaves this
    /// off because the ingress ack is a separate frame from the broadcast.
    pub fn new(
        registry: Arc<RoomRegistry>,
        writer: Arc<WriteSerializer>,
        exclude_sender: bool,
    ) -> Self {
        Self {
            registry,
            writer,
            exclude_sender,
            metrics: Arc::new(BroadcastMetrics::new()),
        }
    }

    /// Fan a message out to its room.
    pub fn broadcast(&self, message: &QueueMessage) -> BroadcastOutcome {
        let sessions = self.registry.snapshot_room(message.room_id);
        if sessions.is_empty() {
            tracing::debug!(room_id = message.room_id, "no live sessions, skipping broadcast");
            return BroadcastOutcome::default();
        }

        let payload = message.to_json();
        let mut outcome = BroadcastOutcome::default();

        for session in sessions {
            if self.exclude_sender && session.user_id().as_deref() == Some(&message.user_id) {
                continue;
            }

            if self.writer.send(&session, payload.clone()) {
                outcome.success += 1;
                self.metrics.record_success();
            } else {
                // Dead sessions are pruned by the write path; a full queue
                // just means this recipient misses the frame.
                outcome.failures += 1;
                self.metrics.record_failure();
            }
        }

        tracing::debug!(
            room_id = message.room_id,
            message_id = %message.message_id,
            success = outcome.success,
            failures = outcome.failures,
            "broadcast complete"
        );

        outcome
    }

    /// Broadcast metrics.
    pub fn metrics(&self) -> &Arc<BroadcastMetrics> {
        &self.metrics
    }
}

#[cfg(test)]
#[path = "broadcast_test.rs"]
mod broadcast_test;
