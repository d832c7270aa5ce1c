//! Dead-letter sink
//!
//! When a batch insert fails, every message of the batch is wrapped in a
//! failure envelope and published individually to a queue dedicated to
//! database failures. The DLQ is not consumed by the fabric; replay is
//! operator-driven.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use roomcast_protocol::QueueMessage;
use roomcast_queue::QueueClient;

use crate::{DlqMetrics, DlqMetricsSnapshot};

/// All DLQ entries share one partition; ordering across failures is
/// irrelevant for operator replay.
const DLQ_GROUP_ID: &str = "database-failures";

/// Failure envelope wrapping an unpersistable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEnvelope {
    #[serde(rename = "originalMessage")]
    pub original_message: QueueMessage,

    #[serde(rename = "failureReason")]
    pub failure_reason: String,

    /// Epoch milliseconds of the failure.
    #[serde(rename = "failureTimestamp")]
    pub failure_timestamp: i64,

    #[serde(rename = "attemptCount")]
    pub attempt_count: u32,
}

/// Ships failed batches to the dead-letter queue.
pub struct DeadLetterSink {
    client: Arc<dyn QueueClient>,
    queue_name: String,
    enabled: bool,
    metrics: Arc<DlqMetrics>,
}

impl DeadLetterSink {
    /// Create a sink; `enabled = false` turns every ship into a logged loss.
    pub fn new(client: Arc<dyn QueueClient>, queue_name: String, enabled: bool) -> Self {
        if !enabled {
            tracing::warn!("dead-letter queue disabled, failed batches will be lost");
        }
        Self {
            client,
            queue_name,
            enabled,
            metrics: Arc::new(DlqMetrics::new()),
        }
    }

    /// Ship a failed batch, one envelope per message.
    ///
    /// Repeat failures of the same message produce distinct DLQ entries:
    /// the dedup id includes the failure timestamp.
    pub async fn ship(&self, messages: &[QueueMessage], failure_reason: &str) {
        if messages.is_empty() {
            return;
        }

        if !self.enabled {
            for message in messages {
                self.metrics.record_lost();
                tracing::error!(
                    message_id = %message.message_id,
                    reason = failure_reason,
                    "DLQ disabled, message lost"
                );
            }
            return;
        }

        let url = match self.client.get_queue_url(&self.queue_name).await {
            Ok(url) => url,
            Err(e) => {
                for message in messages {
                    self.metrics.record_lost();
                    tracing::error!(
                        message_id = %message.message_id,
                        error = %e,
                        "DLQ unreachable, message lost"
                    );
                }
                return;
            }
        };

        tracing::warn!(
            count = messages.len(),
            reason = failure_reason,
            "shipping failed batch to dead-letter queue"
        );

        let failure_timestamp = Utc::now().timestamp_millis();
        for message in messages {
            let envelope = DeadLetterEnvelope {
                original_message: message.clone(),
                failure_reason: failure_reason.to_string(),
                failure_timestamp,
                attempt_count: 1,
            };
            let body = match serde_json::to_string(&envelope) {
                Ok(body) => body,
                Err(e) => {
                    self.metrics.record_lost();
                    tracing::error!(message_id = %message.message_id, error = %e, "failed to serialize DLQ envelope");
                    continue;
                }
            };

            let dedup_id = format!("{}-{}", message.message_id, failure_timestamp);
            match self.client.send(&url, body, DLQ_GROUP_ID, &dedup_id).await {
                Ok(()) => self.metrics.record_sent(),
                Err(e) => {
                    self.metrics.record_lost();
                    tracing::error!(
                        message_id = %message.message_id,
                        error = %e,
                        "failed to ship message to DLQ, message lost"
                    );
                }
            }
        }
    }

    /// DLQ metrics snapshot.
    pub fn metrics_snapshot(&self) -> DlqMetricsSnapshot {
        self.metrics.snapshot()
    }
}
