//! Test doubles for the persistence layer
//!
//! An in-memory [`RecordingStore`] with the same conflict semantics as the
//! real store: inserts are idempotent on message id and activity rollups
//! upsert with a monotonic last-activity. A gate lets tests stall flushes
//! to exercise buffer overflow, and a failure flag forces the DLQ path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;

use roomcast_protocol::QueueMessage;

use crate::store::{MessageStore, UserActivityRow};
use crate::StoreError;

/// Recorded activity rollup state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityState {
    pub first_activity: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub message_count: u64,
}

/// In-memory store with real conflict semantics.
#[derive(Default)]
pub struct RecordingStore {
    rows: Mutex<HashMap<String, QueueMessage>>,
    activity: Mutex<HashMap<(String, u32), ActivityState>>,
    fail_inserts: AtomicBool,
    /// When present, each insert consumes one permit before proceeding.
    gate: Option<Semaphore>,
}

impl RecordingStore {
    /// Store that accepts everything immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose inserts block until [`RecordingStore::release`] is called.
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Default::default()
        }
    }

    /// Allow `permits` gated inserts to proceed.
    pub fn release(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }

    /// Make subsequent inserts fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.fail_inserts.store(failing, Ordering::SeqCst);
    }

    /// Number of distinct persisted messages.
    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// A persisted message by id.
    pub fn row(&self, message_id: &str) -> Option<QueueMessage> {
        self.rows.lock().unwrap().get(message_id).cloned()
    }

    /// Activity rollup for a (user, room) pair.
    pub fn activity(&self, user_id: &str, room_id: u32) -> Option<ActivityState> {
        self.activity
            .lock()
            .unwrap()
            .get(&(user_id.to_string(), room_id))
            .cloned()
    }
}

#[async_trait]
impl MessageStore for RecordingStore {
    async fn batch_insert_messages(
        &self,
        messages: &[QueueMessage],
    ) -> Result<Vec<String>, StoreError> {
        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.expect("gate closed");
            permit.forget();
        }

        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::write("injected insert failure"));
        }

        let mut rows = self.rows.lock().unwrap();
        let mut inserted = Vec::new();
        for message in messages {
            if !rows.contains_key(&message.message_id) {
                rows.insert(message.message_id.clone(), message.clone());
                inserted.push(message.message_id.clone());
            }
        }
        Ok(inserted)
    }

    async fn batch_upsert_user_activity(
        &self,
        rows: &[UserActivityRow],
    ) -> Result<(), StoreError> {
        let mut activity = self.activity.lock().unwrap();
        for row in rows {
            activity
                .entry((row.user_id.clone(), row.room_id))
                .and_modify(|state| {
                    state.last_activity = state.last_activity.max(row.activity_at);
                    state.message_count += 1;
                })
                .or_insert(ActivityState {
                    first_activity: row.activity_at,
                    last_activity: row.activity_at,
                    message_count: 1,
                });
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        !self.fail_inserts.load(Ordering::SeqCst)
    }
}
