//! In-memory queue implementation
//!
//! A faithful in-process stand-in for the hosted queue service: FIFO per
//! queue, receipt handles, visibility timeouts with redelivery in original
//! order, and dedup-id suppression. Backs single-node deployments and the
//! entire test suite.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use crate::client::{
    BatchEntry, BatchSendOutcome, QueueAttributes, QueueClient, ReceivedMessage,
};
use crate::QueueError;

/// How long a dedup id suppresses duplicate sends.
const DEDUP_WINDOW: Duration = Duration::from_secs(300);

/// URL scheme for in-memory queues.
const URL_PREFIX: &str = "mem://";

#[derive(Debug, Clone)]
struct StoredMessage {
    body: String,
}

#[derive(Debug)]
struct InFlight {
    seq: u64,
    message: StoredMessage,
    visible_again: Instant,
}

#[derive(Debug, Default)]
struct QueueInner {
    /// Receivable messages keyed by send sequence; BTreeMap keeps FIFO
    /// order stable across redeliveries.
    visible: BTreeMap<u64, StoredMessage>,

    /// Delivered-but-not-deleted messages keyed by receipt handle.
    in_flight: HashMap<String, InFlight>,

    /// Recently seen dedup ids with their expiry.
    dedup_seen: VecDeque<(String, Instant)>,

    next_seq: u64,
}

impl QueueInner {
    /// Move expired in-flight messages back to the visible set at their
    /// original sequence so redelivery preserves FIFO order.
    fn reclaim_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, f)| f.visible_again <= now)
            .map(|(receipt, _)| receipt.clone())
            .collect();

        for receipt in expired {
            if let Some(flight) = self.in_flight.remove(&receipt) {
                self.visible.insert(flight.seq, flight.message);
            }
        }
    }

    fn is_duplicate(&mut self, dedup_id: &str, now: Instant) -> bool {
        while let Some((_, expiry)) = self.dedup_seen.front() {
            if *expiry <= now {
                self.dedup_seen.pop_front();
            } else {
                break;
            }
        }
        self.dedup_seen.iter().any(|(id, _)| id == dedup_id)
    }

    fn push(&mut self, body: String, dedup_id: &str, now: Instant) -> bool {
        if !dedup_id.is_empty() {
            if self.is_duplicate(dedup_id, now) {
                return false;
            }
            self.dedup_seen
                .push_back((dedup_id.to_string(), now + DEDUP_WINDOW));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.visible.insert(seq, StoredMessage { body });
        true
    }
}

#[derive(Debug)]
struct QueueState {
    inner: Mutex<QueueInner>,
    /// Wakes long-polling receivers when a message arrives.
    arrived: Notify,
}

/// In-process queue service
///
/// Queues are provisioned with [`InMemoryQueue::create_queue`] before use,
/// matching the operator-provisioned model of the hosted service.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    queues: Mutex<HashMap<String, Arc<QueueState>>>,
}

impl InMemoryQueue {
    /// Create an empty queue service
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a queue; idempotent
    pub async fn create_queue(&self, name: &str) {
        let mut queues = self.queues.lock().await;
        queues.entry(name.to_string()).or_insert_with(|| {
            Arc::new(QueueState {
                inner: Mutex::new(QueueInner::default()),
                arrived: Notify::new(),
            })
        });
    }

    async fn resolve(&self, url: &str) -> Result<Arc<QueueState>, QueueError> {
        let name = url
            .strip_prefix(URL_PREFIX)
            .ok_or_else(|| QueueError::UnknownUrl {
                url: url.to_string(),
            })?;
        let queues = self.queues.lock().await;
        queues
            .get(name)
            .cloned()
            .ok_or_else(|| QueueError::UnknownUrl {
                url: url.to_string(),
            })
    }
}

#[async_trait]
impl QueueClient for InMemoryQueue {
    async fn get_queue_url(&self, name: &str) -> Result<String, QueueError> {
        let queues = self.queues.lock().await;
        if queues.contains_key(name) {
            Ok(format!("{URL_PREFIX}{name}"))
        } else {
            Err(QueueError::QueueDoesNotExist {
                name: name.to_string(),
            })
        }
    }

    async fn send(
        &self,
        url: &str,
        body: String,
        _group_id: &str,
        dedup_id: &str,
    ) -> Result<(), QueueError> {
        let state = self.resolve(url).await?;
        let accepted = {
            let mut inner = state.inner.lock().await;
            inner.push(body, dedup_id, Instant::now())
        };
        if accepted {
            state.arrived.notify_waiters();
        } else {
            tracing::debug!(url = %url, dedup_id = %dedup_id, "duplicate send suppressed");
        }
        Ok(())
    }

    async fn send_batch(
        &self,
        url: &str,
        entries: Vec<BatchEntry>,
    ) -> Result<BatchSendOutcome, QueueError> {
        let state = self.resolve(url).await?;
        let mut outcome = BatchSendOutcome::default();
        let now = Instant::now();

        {
            let mut inner = state.inner.lock().await;
            for entry in entries {
                // Entries are appended in submission order, so per-queue
                // order observed by consumers equals producer order.
                inner.push(entry.body, &entry.dedup_id, now);
                outcome.successful.push(entry.id);
            }
        }

        if !outcome.successful.is_empty() {
            state.arrived.notify_waiters();
        }
        Ok(outcome)
    }

    async fn receive(
        &self,
        url: &str,
        max_messages: u32,
        wait_time: Duration,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let state = self.resolve(url).await?;
        let deadline = Instant::now() + wait_time;

        loop {
            let now = Instant::now();
            let batch = {
                let mut inner = state.inner.lock().await;
                inner.reclaim_expired(now);

                let mut batch = Vec::new();
                while batch.len() < max_messages as usize {
                    let Some((seq, message)) = inner.visible.pop_first() else {
                        break;
                    };
                    let receipt = Uuid::new_v4().to_string();
                    batch.push(ReceivedMessage {
                        body: message.body.clone(),
                        receipt_handle: receipt.clone(),
                    });
                    inner.in_flight.insert(
                        receipt,
                        InFlight {
                            seq,
                            message,
                            visible_again: now + visibility_timeout,
                        },
                    );
                }
                batch
            };

            if !batch.is_empty() {
                return Ok(batch);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }

            // Long poll: sleep until something arrives or the wait expires.
            // Redelivery of expired in-flight messages is driven by the
            // timeout branch re-running reclaim.
            let remaining = deadline - now;
            let poll_slice = remaining.min(Duration::from_millis(100));
            tokio::select! {
                _ = state.arrived.notified() => {}
                _ = tokio::time::sleep(poll_slice) => {}
            }
        }
    }

    async fn delete(&self, url: &str, receipt_handle: &str) -> Result<(), QueueError> {
        let state = self.resolve(url).await?;
        let mut inner = state.inner.lock().await;
        inner
            .in_flight
            .remove(receipt_handle)
            .map(|_| ())
            .ok_or(QueueError::InvalidReceipt)
    }

    async fn attributes(&self, url: &str) -> Result<QueueAttributes, QueueError> {
        let state = self.resolve(url).await?;
        let mut inner = state.inner.lock().await;
        inner.reclaim_expired(Instant::now());
        Ok(QueueAttributes {
            approx_messages: inner.visible.len() as u64,
            approx_not_visible: inner.in_flight.len() as u64,
            approx_delayed: 0,
        })
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod memory_test;
