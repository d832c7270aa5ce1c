use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use roomcast_protocol::{MessageKind, QueueMessage};
use tokio_util::sync::CancellationToken;

use crate::{Broadcaster, FrameTransport, RoomRegistry, Session, WriteSerializer};

#[derive(Default)]
struct CollectingTransport {
    frames: Mutex<Vec<String>>,
}

#[async_trait]
impl FrameTransport for CollectingTransport {
    async fn send_text(&self, text: &str) -> std::io::Result<()> {
        self.frames.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn message(room_id: u32, user_id: &str, text: &str) -> QueueMessage {
    QueueMessage {
        message_id: format!("msg-{text}"),
        room_id,
        user_id: user_id.into(),
        username: "alice".into(),
        message: text.into(),
        timestamp: "2025-01-01T00:00:00Z".into(),
        message_type: MessageKind::Text,
        server_id: "node-1".into(),
        client_ip: "10.0.0.1".into(),
    }
}

struct Fixture {
    registry: Arc<RoomRegistry>,
    writer: Arc<WriteSerializer>,
    _cancel: CancellationToken,
}

fn fixture() -> Fixture {
    let registry = Arc::new(RoomRegistry::new());
    let cancel = CancellationToken::new();
    let (writer, _handles) = WriteSerializer::start(Arc::clone(&registry), 4, cancel.clone());
    Fixture {
        registry,
        writer,
        _cancel: cancel,
    }
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..300 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within timeout");
}

#[tokio::test]
async fn broadcasts_to_all_room_sessions() {
    let f = fixture();
    let transports: Vec<Arc<CollectingTransport>> =
        (0..3).map(|_| Arc::new(CollectingTransport::default())).collect();
    for transport in &transports {
        f.registry
            .add(Session::new(5, 100, transport.clone() as Arc<dyn FrameTransport>));
    }
    // A session in another room must not receive anything.
    let other = Arc::new(CollectingTransport::default());
    f.registry
        .add(Session::new(6, 100, other.clone() as Arc<dyn FrameTransport>));

    let broadcaster = Broadcaster::new(Arc::clone(&f.registry), Arc::clone(&f.writer), false);
    let outcome = broadcaster.broadcast(&message(5, "42", "hello"));
    assert_eq!(outcome.success, 3);
    assert_eq!(outcome.failures, 0);

    wait_for(|| transports.iter().all(|t| t.frames.lock().unwrap().len() == 1)).await;
    let frame = transports[0].frames.lock().unwrap()[0].clone();
    let parsed = QueueMessage::from_json(&frame).unwrap();
    assert_eq!(parsed.message, "hello");
    assert!(other.frames.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_room_is_a_noop() {
    let f = fixture();
    let broadcaster = Broadcaster::new(Arc::clone(&f.registry), Arc::clone(&f.writer), false);
    let outcome = broadcaster.broadcast(&message(9, "42", "nobody-home"));
    assert_eq!(outcome, crate::BroadcastOutcome::default());
}

#[tokio::test]
async fn sender_exclusion_skips_matching_user() {
    let f = fixture();
    let sender_transport = Arc::new(CollectingTransport::default());
    let other_transport = Arc::new(CollectingTransport::default());

    let sender = Session::new(2, 100, sender_transport.clone() as Arc<dyn FrameTransport>);
    sender.set_user_id("42");
    let other = Session::new(2, 100, other_transport.clone() as Arc<dyn FrameTransport>);
    other.set_user_id("7");
    f.registry.add(sender);
    f.registry.add(other);

    let broadcaster = Broadcaster::new(Arc::clone(&f.registry), Arc::clone(&f.writer), true);
    let outcome = broadcaster.broadcast(&message(2, "42", "hi"));
    assert_eq!(outcome.success, 1);

    wait_for(|| other_transport.frames.lock().unwrap().len() == 1).await;
    assert!(sender_transport.frames.lock().unwrap().is_empty());
}

#[tokio::test]
async fn closed_sessions_count_as_failures() {
    let f = fixture();
    let live_transport = Arc::new(CollectingTransport::default());
    let live = Session::new(4, 100, live_transport.clone() as Arc<dyn FrameTransport>);
    let dead = Session::new(4, 100, Arc::new(CollectingTransport::default()) as Arc<dyn FrameTransport>);
    f.registry.add(Arc::clone(&live));
    f.registry.add(Arc::clone(&dead));
    dead.close();

    let broadcaster = Broadcaster::new(Arc::clone(&f.registry), Arc::clone(&f.writer), false);
    let outcome = broadcaster.broadcast(&message(4, "42", "partial"));
    assert_eq!(outcome.success, 1);
    assert_eq!(outcome.failures, 1);
    assert_eq!(broadcaster.metrics().snapshot().failures, 1);

    // The healthy recipient is unaffected by the dead one.
    wait_for(|| live_transport.frames.lock().unwrap().len() == 1).await;
}
