//! Roomcast sessions
//!
//! Everything that touches a live socket on the outbound side: the
//! [`Session`] type bound to a room, the [`RoomRegistry`] tracking live
//! sessions per room, the [`WriteSerializer`] that guarantees a single
//! concurrent writer per socket without a thread per connection, and the
//! [`Broadcaster`] fanning queue messages out to a room.
//!
//! # Single-writer invariant
//!
//! The underlying socket write is not reentrant; concurrent writes corrupt
//! framing. Every outbound frame therefore goes through the serializer's
//! per-session FIFO, drained by a fixed shared worker pool. At most one
//! worker drains a given session at any time, enforced by a per-session
//! work-in-progress counter (see [`WriteSerializer`]).

mod broadcast;
mod metrics;
mod registry;
mod session;
mod transport;
mod writer;

pub use broadcast::{BroadcastOutcome, Broadcaster};
pub use metrics::{
    BroadcastMetrics, BroadcastMetricsSnapshot, WriterMetrics, WriterMetricsSnapshot,
};
pub use registry::RoomRegistry;
pub use session::{Session, SessionId};
pub use transport::FrameTransport;
pub use writer::WriteSerializer;
