//! Roomcast wire protocol
//!
//! Types that cross the two wire boundaries of the fabric:
//!
//! - **Ingress**: clients send [`ChatFrame`] JSON over the WebSocket and
//!   receive [`MessageResponse`] acks/errors plus broadcast envelopes.
//! - **Queue**: nodes exchange [`QueueMessage`] JSON through the
//!   room-partitioned external queue.
//!
//! Timestamps stay ISO-8601 strings across both boundaries and are parsed
//! to an instant only at the persistence edge.

mod error;
mod frame;
mod queue_message;
mod response;
mod validate;

pub use error::ProtocolError;
pub use frame::{ChatFrame, MessageKind};
pub use queue_message::QueueMessage;
pub use response::MessageResponse;
pub use validate::{validate_frame, ValidationError};

/// Default number of rooms in the fabric.
pub const DEFAULT_ROOMS: u32 = 20;
