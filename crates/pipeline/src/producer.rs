//! Queue producer (single-send mode)
//!
//! Publishes one message per call to the room's queue partition, returning
//! success or failure to the ingress caller so the ack/error response can
//! reflect it. Queue URLs are resolved lazily and cached; a failed lookup
//! is retried no more often than the configured interval, and a missing
//! URL for one room never affects the others.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use roomcast_config::QueueConfig;
use roomcast_protocol::QueueMessage;
use roomcast_queue::{QueueAttributes, QueueClient};

use crate::{ProducerMetrics, ProducerMetricsSnapshot};

/// Room-partitioned message producer with a lazy URL cache.
pub struct QueueProducer {
    client: Arc<dyn QueueClient>,
    config: QueueConfig,
    url_cache: DashMap<u32, String>,
    /// Last failed lookup per room; lookups are suppressed until the retry
    /// interval has passed.
    url_retry_at: DashMap<u32, Instant>,
    metrics: Arc<ProducerMetrics>,
}

impl QueueProducer {
    /// Create a producer over the given queue client.
    pub fn new(client: Arc<dyn QueueClient>, config: QueueConfig) -> Self {
        tracing::info!(
            prefix = %config.prefix,
            fifo = config.fifo_enabled,
            url_retry_ms = config.url_retry_ms,
            "queue producer initialized, URLs resolved on demand"
        );
        Self {
            client,
            config,
            url_cache: DashMap::new(),
            url_retry_at: DashMap::new(),
            metrics: Arc::new(ProducerMetrics::new()),
        }
    }

    /// Publish a message to its room partition.
    ///
    /// Partition key is the room id, dedup id is the message id. Returns
    /// `false` when the URL is unresolved or the send failed; the caller
    /// reports the error to the client and the connection stays open.
    pub async fn publish(&self, message: &QueueMessage) -> bool {
        let Some(url) = self.queue_url(message.room_id).await else {
            tracing::error!(room_id = message.room_id, "queue URL not available for room");
            self.metrics.record_failure();
            return false;
        };

        let group_id = message.room_id.to_string();
        match self
            .client
            .send(&url, message.to_json(), &group_id, &message.message_id)
            .await
        {
            Ok(()) => {
                self.metrics.record_sent();
                tracing::debug!(
                    room_id = message.room_id,
                    message_id = %message.message_id,
                    "message published"
                );
                true
            }
            Err(e) => {
                self.metrics.record_failure();
                tracing::error!(
                    room_id = message.room_id,
                    message_id = %message.message_id,
                    error = %e,
                    "failed to publish message"
                );
                false
            }
        }
    }

    /// Resolve a room's queue URL, lazily with failure backoff.
    ///
    /// Returns the cached URL when known. Otherwise attempts a lookup,
    /// unless one failed within the retry interval, in which case the room
    /// is skipped until the interval elapses.
    pub async fn queue_url(&self, room_id: u32) -> Option<String> {
        if let Some(url) = self.url_cache.get(&room_id) {
            return Some(url.clone());
        }

        let retry_interval = Duration::from_millis(self.config.url_retry_ms);
        if let Some(last_failure) = self.url_retry_at.get(&room_id).map(|t| *t) {
            if last_failure.elapsed() < retry_interval {
                tracing::debug!(room_id, "queue URL lookup suppressed until retry interval");
                return None;
            }
        }

        let queue_name = self.config.queue_name(room_id);
        match self.client.get_queue_url(&queue_name).await {
            Ok(url) => {
                tracing::info!(room_id, queue = %queue_name, url = %url, "queue URL resolved");
                self.url_cache.insert(room_id, url.clone());
                self.url_retry_at.remove(&room_id);
                Some(url)
            }
            Err(e) => {
                tracing::warn!(
                    room_id,
                    queue = %queue_name,
                    error = %e,
                    retry_ms = self.config.url_retry_ms,
                    "failed to resolve queue URL, will retry"
                );
                self.url_retry_at.insert(room_id, Instant::now());
                None
            }
        }
    }

    /// Depth counters for a room's queue, for the metrics surface.
    pub async fn queue_attributes(&self, room_id: u32) -> Option<QueueAttributes> {
        let url = self.queue_url(room_id).await?;
        match self.client.attributes(&url).await {
            Ok(attrs) => Some(attrs),
            Err(e) => {
                tracing::warn!(room_id, error = %e, "failed to fetch queue attributes");
                None
            }
        }
    }

    /// The underlying queue client.
    pub fn client(&self) -> &Arc<dyn QueueClient> {
        &self.client
    }

    /// Queue naming configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Producer metrics snapshot.
    pub fn metrics_snapshot(&self) -> ProducerMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
#[path = "producer_test.rs"]
mod producer_test;
