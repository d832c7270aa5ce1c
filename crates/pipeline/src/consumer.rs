//! Consumer pool
//!
//! Long-polls the queues of the rooms this node owns and drives each
//! message through fan-out and persistence. A fixed worker set shares the
//! assigned rooms; each worker owns a disjoint subset and polls it in a
//! rotating loop, so no room is ever read by two workers on one node.
//!
//! # Ack discipline
//!
//! A queue message is deleted iff the batch writer accepted it. Broadcast
//! is best-effort and never gates the ack; a full writer buffer or a
//! processing error leaves the message invisible until the visibility
//! timeout, after which the queue redelivers it.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use roomcast_config::ConsumerConfig;
use roomcast_persist::BatchWriterHandle;
use roomcast_protocol::QueueMessage;
use roomcast_queue::ReceivedMessage;
use roomcast_session::Broadcaster;

use crate::{ConsumerMetrics, ConsumerMetricsSnapshot, QueueProducer};

/// Sleep between poll sweeps that returned nothing, to avoid tight loops
/// on empty queues when long-poll waits are configured short.
const IDLE_SLEEP: Duration = Duration::from_millis(100);

/// Pool of room consumers.
pub struct ConsumerPool {
    producer: Arc<QueueProducer>,
    broadcaster: Arc<Broadcaster>,
    writer: BatchWriterHandle,
    config: ConsumerConfig,
    metrics: Arc<ConsumerMetrics>,
}

impl ConsumerPool {
    /// Create a pool; `start` spawns the workers.
    pub fn new(
        producer: Arc<QueueProducer>,
        broadcaster: Arc<Broadcaster>,
        writer: BatchWriterHandle,
        config: ConsumerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            producer,
            broadcaster,
            writer,
            config,
            metrics: Arc::new(ConsumerMetrics::new()),
        })
    }

    /// Spawn `min(threads, assigned_rooms)` workers over the assigned rooms.
    ///
    /// Rooms are dealt round-robin across the workers, so each worker owns
    /// a disjoint subset and no room is polled twice on this node.
    pub fn start(
        self: &Arc<Self>,
        assigned_rooms: Vec<u32>,
        cancel: CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        if !self.config.enabled {
            tracing::info!("consumer disabled");
            return Vec::new();
        }
        if assigned_rooms.is_empty() {
            tracing::error!("no rooms assigned to this node, consumer will not start");
            return Vec::new();
        }

        let worker_count = self.config.threads.min(assigned_rooms.len());
        let mut buckets: Vec<Vec<u32>> = vec![Vec::new(); worker_count];
        for (index, room) in assigned_rooms.iter().enumerate() {
            buckets[index % worker_count].push(*room);
        }

        tracing::info!(
            workers = worker_count,
            rooms = assigned_rooms.len(),
            "starting consumer pool"
        );

        let mut handles = Vec::with_capacity(worker_count);

        for (worker_id, rooms) in buckets.into_iter().enumerate() {
            let pool = Arc::clone(self);
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                tracing::info!(worker_id, ?rooms, "consumer worker started");
                pool.worker_loop(worker_id, rooms, cancel).await;
                tracing::info!(worker_id, "consumer worker stopped");
            }));
        }

        handles
    }

    /// Rotating poll loop over this worker's rooms.
    async fn worker_loop(&self, worker_id: usize, rooms: Vec<u32>, cancel: CancellationToken) {
        let mut iterations = 0u64;

        while !cancel.is_cancelled() {
            iterations += 1;
            let mut any_received = false;

            for &room_id in &rooms {
                if cancel.is_cancelled() {
                    break;
                }

                let Some(url) = self.producer.queue_url(room_id).await else {
                    // Lazy URL loading retries on its own schedule; the
                    // room is skipped for this sweep without affecting the
                    // others. Log occasionally rather than every sweep.
                    if iterations % 100 == 1 {
                        tracing::warn!(worker_id, room_id, "queue URL not yet known, skipping room");
                    }
                    continue;
                };

                let received = tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = self.producer.client().receive(
                        &url,
                        self.config.max_messages,
                        self.config.wait_time(),
                        self.config.visibility_timeout(),
                    ) => match result {
                        Ok(messages) => messages,
                        Err(e) => {
                            tracing::error!(worker_id, room_id, error = %e, "receive failed");
                            continue;
                        }
                    },
                };

                if !received.is_empty() {
                    any_received = true;
                    tracing::debug!(worker_id, room_id, count = received.len(), "messages received");
                }

                for message in received {
                    if cancel.is_cancelled() {
                        break;
                    }
                    self.process(&url, message, worker_id).await;
                }
            }

            if !any_received && !cancel.is_cancelled() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(IDLE_SLEEP) => {}
                }
            }
        }
    }

    /// Handle one delivery: broadcast, enqueue for persistence, and delete
    /// from the queue only when the writer accepted it.
    async fn process(&self, url: &str, received: ReceivedMessage, worker_id: usize) {
        let message = match QueueMessage::from_json(&received.body) {
            Ok(message) => message,
            Err(e) => {
                // Not acked; the malformed body comes back after the
                // visibility timeout and ultimately parks in the service's
                // own poison-message handling.
                self.metrics.record_failed();
                tracing::error!(worker_id, error = %e, "failed to deserialize queue message");
                return;
            }
        };

        let outcome = self.broadcaster.broadcast(&message);

        if self.writer.enqueue(message.clone()) {
            match self
                .producer
                .client()
                .delete(url, &received.receipt_handle)
                .await
            {
                Ok(()) => {
                    self.metrics.record_processed();
                    if outcome.success == 0 {
                        tracing::debug!(
                            message_id = %message.message_id,
                            "message persisted with no live recipients"
                        );
                    }
                }
                Err(e) => {
                    // The writer has the message; a redelivery will be
                    // deduplicated by the idempotent insert.
                    tracing::error!(message_id = %message.message_id, error = %e, "failed to delete queue message");
                }
            }
        } else {
            self.metrics.record_failed();
            tracing::warn!(
                worker_id,
                message_id = %message.message_id,
                "writer buffer full, message left for redelivery"
            );
        }
    }

    /// Consumer metrics snapshot.
    pub fn metrics_snapshot(&self) -> ConsumerMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
#[path = "consumer_test.rs"]
mod consumer_test;
