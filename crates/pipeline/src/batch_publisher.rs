//! Micro-batch producer
//!
//! Trades ack strictness for a ~10x reduction in queue API calls: messages
//! accumulate in a bounded per-room batch and are shipped by a background
//! flusher every `flush_ms`, or eagerly when a room reaches `max_size`.
//! `publish` reports accepted as soon as the message is in the batch, so
//! the sender's ack is optimistic. Failed entries are counted and dropped;
//! the producer side has no dead-letter path.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use roomcast_config::ProducerBatchConfig;
use roomcast_protocol::QueueMessage;
use roomcast_queue::BatchEntry;

use crate::{BatchProducerMetrics, BatchProducerMetricsSnapshot, QueueProducer};

/// Per-room batching front for the queue producer.
pub struct BatchPublisher {
    producer: Arc<QueueProducer>,
    config: ProducerBatchConfig,
    /// Index r-1 holds room r's pending batch.
    batches: Vec<Mutex<VecDeque<QueueMessage>>>,
    metrics: Arc<BatchProducerMetrics>,
}

impl BatchPublisher {
    /// Create a publisher covering rooms `1..=rooms`.
    pub fn new(producer: Arc<QueueProducer>, config: ProducerBatchConfig, rooms: u32) -> Self {
        tracing::info!(
            max_size = config.max_size,
            flush_ms = config.flush_ms,
            room_capacity = config.room_capacity,
            rooms,
            "micro-batch producer enabled, sender acks are optimistic"
        );
        let batches = (0..rooms).map(|_| Mutex::new(VecDeque::new())).collect();
        Self {
            producer,
            config,
            batches,
            metrics: Arc::new(BatchProducerMetrics::new()),
        }
    }

    /// Accept a message into its room's batch.
    ///
    /// Returns `true` as soon as the message is buffered - before any
    /// network send. `false` means the room's batch is full (message
    /// dropped) or the room id is out of range.
    pub async fn publish(&self, message: QueueMessage) -> bool {
        let Some(slot) = self.room_slot(message.room_id) else {
            tracing::error!(room_id = message.room_id, "no batch for room");
            self.metrics.record_dropped(1);
            return false;
        };

        let room_id = message.room_id;
        let reached_max = {
            let mut batch = slot.lock().await;
            if batch.len() >= self.config.room_capacity {
                tracing::warn!(room_id, "room batch full, dropping message");
                self.metrics.record_dropped(1);
                return false;
            }
            batch.push_back(message);
            batch.len() >= self.config.max_size
        };
        self.metrics.record_queued();

        // Eager flush keeps burst latency bounded by the send, not the
        // flusher interval.
        if reached_max {
            self.flush_room(room_id).await;
        }
        true
    }

    /// Run the interval flusher until cancelled, then flush everything.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(Duration::from_millis(self.config.flush_ms));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.flush_all().await;
                }
            }
        }

        // Final flush: drain every room completely, not just one batch.
        tracing::info!("flushing remaining batched messages");
        for room_index in 0..self.batches.len() {
            let room_id = room_index as u32 + 1;
            while self.pending(room_id).await > 0 {
                self.flush_room(room_id).await;
            }
        }

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            queued = snapshot.queued,
            batches_sent = snapshot.batches_sent,
            messages_in_batches = snapshot.messages_in_batches,
            batches_failed = snapshot.batches_failed,
            dropped = snapshot.dropped,
            "micro-batch producer stopped"
        );
    }

    /// Flush every room's pending batch once.
    async fn flush_all(&self) {
        for room_index in 0..self.batches.len() {
            self.flush_room(room_index as u32 + 1).await;
        }
    }

    /// Drain up to `max_size` messages from a room and issue one batch send.
    async fn flush_room(&self, room_id: u32) {
        let Some(slot) = self.room_slot(room_id) else {
            return;
        };

        let drained: Vec<QueueMessage> = {
            let mut batch = slot.lock().await;
            let take = batch.len().min(self.config.max_size);
            batch.drain(..take).collect()
        };
        if drained.is_empty() {
            return;
        }

        let Some(url) = self.producer.queue_url(room_id).await else {
            tracing::error!(
                room_id,
                count = drained.len(),
                "queue URL not available, dropping batch"
            );
            self.metrics.record_dropped(drained.len() as u64);
            return;
        };

        let group_id = room_id.to_string();
        let entries: Vec<BatchEntry> = drained
            .iter()
            .map(|msg| BatchEntry {
                id: msg.message_id.clone(),
                body: msg.to_json(),
                group_id: group_id.clone(),
                dedup_id: msg.message_id.clone(),
            })
            .collect();
        let entry_count = entries.len() as u64;

        match self.producer.client().send_batch(&url, entries).await {
            Ok(outcome) => {
                self.metrics.record_batch(entry_count);
                if !outcome.failed.is_empty() {
                    self.metrics.record_batch_failed();
                    self.metrics.record_dropped(outcome.failed.len() as u64);
                    for (id, reason) in &outcome.failed {
                        tracing::error!(room_id, message_id = %id, reason = %reason, "batch entry failed, message lost");
                    }
                }
                tracing::debug!(
                    room_id,
                    sent = outcome.successful.len(),
                    failed = outcome.failed.len(),
                    "batch send complete"
                );
            }
            Err(e) => {
                self.metrics.record_batch_failed();
                self.metrics.record_dropped(entry_count);
                tracing::error!(room_id, error = %e, count = entry_count, "batch send failed, messages lost");
            }
        }
    }

    /// Messages waiting in a room's batch.
    pub async fn pending(&self, room_id: u32) -> usize {
        match self.room_slot(room_id) {
            Some(slot) => slot.lock().await.len(),
            None => 0,
        }
    }

    fn room_slot(&self, room_id: u32) -> Option<&Mutex<VecDeque<QueueMessage>>> {
        if room_id == 0 {
            return None;
        }
        self.batches.get(room_id as usize - 1)
    }

    /// Batch producer metrics snapshot.
    pub fn metrics_snapshot(&self) -> BatchProducerMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
#[path = "batch_publisher_test.rs"]
mod batch_publisher_test;
