//! Session type
//!
//! One `Session` per live socket connection, created by the ingress on
//! connect, owned by the registry while live, and torn down on close or the
//! first write error. The room binding is immutable after construction; the
//! authoritative liveness signal is the socket itself, surfaced here as the
//! `open` flag.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use crate::FrameTransport;

/// Per-connection unique identifier.
pub type SessionId = u64;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// A live socket session bound to a room.
pub struct Session {
    id: SessionId,
    room_id: u32,

    /// User id from the first valid frame; used for optional
    /// sender-exclusion during broadcast.
    user_id: RwLock<Option<String>>,

    /// Cleared on client disconnect, transport error, or the first IO
    /// error during a drain. Terminal.
    open: AtomicBool,

    /// Bounded FIFO of outbound frames awaiting the serializer.
    write_queue: Mutex<VecDeque<String>>,
    write_queue_capacity: usize,

    /// Work-in-progress counter for the serializer's drain protocol.
    pub(crate) wip: AtomicUsize,

    pub(crate) transport: Arc<dyn FrameTransport>,
}

impl Session {
    /// Create a session bound to `room_id`.
    pub fn new(
        room_id: u32,
        write_queue_capacity: usize,
        transport: Arc<dyn FrameTransport>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            room_id,
            user_id: RwLock::new(None),
            open: AtomicBool::new(true),
            write_queue: Mutex::new(VecDeque::with_capacity(write_queue_capacity.min(64))),
            write_queue_capacity,
            wip: AtomicUsize::new(0),
            transport,
        })
    }

    /// Per-connection unique id.
    #[inline]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The room this session is bound to.
    #[inline]
    pub fn room_id(&self) -> u32 {
        self.room_id
    }

    /// Whether the socket is still considered live.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Record the user id observed on a valid frame.
    pub fn set_user_id(&self, user_id: &str) {
        let mut slot = self.user_id.write().unwrap_or_else(|e| e.into_inner());
        if slot.as_deref() != Some(user_id) {
            *slot = Some(user_id.to_string());
        }
    }

    /// User id of the last valid frame, if any.
    pub fn user_id(&self) -> Option<String> {
        self.user_id
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Mark the session closed and discard queued frames.
    ///
    /// Returns the number of frames dropped. Idempotent.
    pub fn close(&self) -> usize {
        self.open.store(false, Ordering::Release);
        let mut queue = self.write_queue.lock().unwrap_or_else(|e| e.into_inner());
        let dropped = queue.len();
        queue.clear();
        dropped
    }

    /// Offer a frame to the write queue; `false` when the queue is full.
    pub(crate) fn offer(&self, frame: String) -> bool {
        let mut queue = self.write_queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= self.write_queue_capacity {
            return false;
        }
        queue.push_back(frame);
        true
    }

    /// Take the next queued frame, if any.
    pub(crate) fn poll(&self) -> Option<String> {
        self.write_queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
    }

    /// Queued frame count (for metrics).
    pub fn queued_frames(&self) -> usize {
        self.write_queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("room_id", &self.room_id)
            .field("open", &self.is_open())
            .field("queued", &self.queued_frames())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NullTransport;

    #[async_trait]
    impl FrameTransport for NullTransport {
        async fn send_text(&self, _text: &str) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn session(capacity: usize) -> Arc<Session> {
        Session::new(1, capacity, Arc::new(NullTransport))
    }

    #[test]
    fn ids_are_unique() {
        let a = session(10);
        let b = session(10);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn offer_rejects_when_full() {
        let s = session(2);
        assert!(s.offer("a".into()));
        assert!(s.offer("b".into()));
        assert!(!s.offer("c".into()));
        // Draining one frees a slot.
        assert_eq!(s.poll().as_deref(), Some("a"));
        assert!(s.offer("c".into()));
    }

    #[test]
    fn close_discards_queue_and_reports_count() {
        let s = session(10);
        s.offer("a".into());
        s.offer("b".into());
        assert_eq!(s.close(), 2);
        assert!(!s.is_open());
        assert_eq!(s.queued_frames(), 0);
        // Second close drops nothing further.
        assert_eq!(s.close(), 0);
    }

    #[test]
    fn user_id_recorded_once_observed() {
        let s = session(10);
        assert_eq!(s.user_id(), None);
        s.set_user_id("42");
        assert_eq!(s.user_id().as_deref(), Some("42"));
    }
}
