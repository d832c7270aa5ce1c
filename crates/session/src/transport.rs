//! Socket transport seam
//!
//! The serializer drains frames into a [`FrameTransport`]. Production wires
//! the WebSocket sink; tests substitute a recording transport to observe
//! write intervals and injected failures.

use async_trait::async_trait;

/// Outbound half of a session's socket
///
/// `send_text` is not required to be reentrant; the write serializer
/// guarantees at most one in-flight call per transport.
#[async_trait]
pub trait FrameTransport: Send + Sync {
    /// Write one text frame to the peer
    async fn send_text(&self, text: &str) -> std::io::Result<()>;
}
