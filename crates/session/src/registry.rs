//! Room session registry
//!
//! Maps each room to its live sessions on this node. Internally
//! synchronized; readers take owned snapshots so broadcast iteration never
//! holds a registry lock across a send. Empty room entries are pruned on
//! removal.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::{Session, SessionId};

/// Per-room set of live sessions.
///
/// A session belongs to at most one room at a time; re-adding a session
/// under a different room id removes it from the previous room first,
/// under the same call. No ordering is promised between concurrent
/// add/remove and snapshot - a concurrently added session may or may not
/// appear in an in-flight broadcast.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<u32, HashMap<SessionId, Arc<Session>>>,
    session_rooms: DashMap<SessionId, u32>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under its bound room.
    pub fn add(&self, session: Arc<Session>) {
        let room_id = session.room_id();

        // Atomic move: drop any previous membership before inserting.
        if let Some(previous) = self.session_rooms.get(&session.id()).map(|r| *r) {
            if previous != room_id {
                self.remove_from_room(previous, session.id());
            }
        }

        self.rooms
            .entry(room_id)
            .or_default()
            .insert(session.id(), Arc::clone(&session));
        self.session_rooms.insert(session.id(), room_id);

        tracing::debug!(session_id = session.id(), room_id, "session registered");
    }

    /// Unregister a session; returns whether it was present.
    pub fn remove(&self, session: &Session) -> bool {
        let Some((_, room_id)) = self.session_rooms.remove(&session.id()) else {
            return false;
        };
        self.remove_from_room(room_id, session.id());
        tracing::debug!(session_id = session.id(), room_id, "session unregistered");
        true
    }

    fn remove_from_room(&self, room_id: u32, session_id: SessionId) {
        if let Some(mut sessions) = self.rooms.get_mut(&room_id) {
            sessions.remove(&session_id);
        }
        // Prune the entry when the room emptied; remove_if re-checks under
        // the shard lock so a concurrent add is not lost.
        self.rooms.remove_if(&room_id, |_, sessions| sessions.is_empty());
    }

    /// Owned snapshot of a room's live sessions.
    pub fn snapshot_room(&self, room_id: u32) -> Vec<Arc<Session>> {
        self.rooms
            .get(&room_id)
            .map(|sessions| sessions.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Live sessions in one room.
    pub fn room_session_count(&self, room_id: u32) -> usize {
        self.rooms.get(&room_id).map(|s| s.len()).unwrap_or(0)
    }

    /// Live sessions across all rooms.
    pub fn total_sessions(&self) -> usize {
        self.session_rooms.len()
    }

    /// Rooms with at least one live session.
    pub fn active_rooms(&self) -> usize {
        self.rooms.len()
    }

    /// (room, session count) pairs for the metrics surface.
    pub fn room_stats(&self) -> Vec<(u32, usize)> {
        let mut stats: Vec<(u32, usize)> = self
            .rooms
            .iter()
            .map(|entry| (*entry.key(), entry.value().len()))
            .collect();
        stats.sort_unstable_by_key(|(room, _)| *room);
        stats
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;
