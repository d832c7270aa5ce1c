use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use roomcast_config::{BatchWriterConfig, ConsumerConfig, QueueConfig};
use roomcast_persist::test_support::RecordingStore;
use roomcast_persist::{BatchWriter, BatchWriterHandle, DeadLetterSink, MessageStore};
use roomcast_protocol::{MessageKind, QueueMessage};
use roomcast_queue::{InMemoryQueue, QueueClient};
use roomcast_session::{Broadcaster, FrameTransport, RoomRegistry, Session, WriteSerializer};
use tokio_util::sync::CancellationToken;

use crate::{ConsumerPool, QueueProducer};

#[derive(Default)]
struct CollectingTransport {
    frames: Mutex<Vec<String>>,
}

impl CollectingTransport {
    fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }
}

#[async_trait]
impl FrameTransport for CollectingTransport {
    async fn send_text(&self, text: &str) -> std::io::Result<()> {
        self.frames.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn message(room_id: u32, id: &str) -> QueueMessage {
    QueueMessage {
        message_id: id.into(),
        room_id,
        user_id: "42".into(),
        username: "alice".into(),
        message: format!("text-{id}"),
        timestamp: "2025-01-01T00:00:00Z".into(),
        message_type: MessageKind::Text,
        server_id: "node-1".into(),
        client_ip: "10.0.0.1".into(),
    }
}

struct Fixture {
    queue: Arc<InMemoryQueue>,
    producer: Arc<QueueProducer>,
    registry: Arc<RoomRegistry>,
    broadcaster: Arc<Broadcaster>,
    store: Arc<RecordingStore>,
    writer_handle: BatchWriterHandle,
    writer: Option<BatchWriter>,
    cancel: CancellationToken,
}

async fn fixture(rooms: &[u32], writer_capacity: usize) -> Fixture {
    let queue = Arc::new(InMemoryQueue::new());
    for room in rooms {
        queue.create_queue(&format!("roomcast-room-{room}.fifo")).await;
    }
    let producer = Arc::new(QueueProducer::new(
        queue.clone() as Arc<dyn QueueClient>,
        QueueConfig::default(),
    ));

    let cancel = CancellationToken::new();
    let registry = Arc::new(RoomRegistry::new());
    let (serializer, _handles) =
        WriteSerializer::start(Arc::clone(&registry), 4, cancel.clone());
    let broadcaster = Arc::new(Broadcaster::new(
        Arc::clone(&registry),
        serializer,
        false,
    ));

    let store = Arc::new(RecordingStore::new());
    let dlq = Arc::new(DeadLetterSink::new(
        queue.clone() as Arc<dyn QueueClient>,
        "dlq".into(),
        false,
    ));
    let (writer, writer_handle) = BatchWriter::new(
        BatchWriterConfig {
            size: 10,
            flush_ms: 20,
            buffer_capacity: writer_capacity,
        },
        Arc::clone(&store) as Arc<dyn MessageStore>,
        dlq,
    );

    Fixture {
        queue,
        producer,
        registry,
        broadcaster,
        store,
        writer_handle,
        writer: Some(writer),
        cancel,
    }
}

fn consumer_config(threads: usize) -> ConsumerConfig {
    ConsumerConfig {
        enabled: true,
        threads,
        max_messages: 10,
        wait_time_secs: 1,
        visibility_timeout_secs: 1,
    }
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within timeout");
}

#[tokio::test]
async fn delivered_message_is_broadcast_persisted_and_acked() {
    let mut f = fixture(&[1], 100).await;
    tokio::spawn(f.writer.take().unwrap().run(f.cancel.clone()));

    let transport = Arc::new(CollectingTransport::default());
    f.registry
        .add(Session::new(1, 100, transport.clone() as Arc<dyn FrameTransport>));

    let pool = ConsumerPool::new(
        Arc::clone(&f.producer),
        Arc::clone(&f.broadcaster),
        f.writer_handle.clone(),
        consumer_config(1),
    );
    let _workers = pool.start(vec![1], f.cancel.clone());

    assert!(f.producer.publish(&message(1, "m1")).await);

    wait_for(|| transport.frames().len() == 1).await;
    wait_for(|| f.store.row_count() == 1).await;
    wait_for(|| pool.metrics_snapshot().processed == 1).await;

    // Acked: nothing visible or in flight remains.
    let url = f.queue.get_queue_url("roomcast-room-1.fifo").await.unwrap();
    let attrs = f.queue.attributes(&url).await.unwrap();
    assert_eq!(attrs.approx_messages + attrs.approx_not_visible, 0);

    let delivered = QueueMessage::from_json(&transport.frames()[0]).unwrap();
    assert_eq!(delivered.message_id, "m1");

    f.cancel.cancel();
}

#[tokio::test]
async fn per_room_fifo_order_is_preserved() {
    let mut f = fixture(&[7], 100).await;
    tokio::spawn(f.writer.take().unwrap().run(f.cancel.clone()));

    let transport = Arc::new(CollectingTransport::default());
    f.registry
        .add(Session::new(7, 100, transport.clone() as Arc<dyn FrameTransport>));

    let pool = ConsumerPool::new(
        Arc::clone(&f.producer),
        Arc::clone(&f.broadcaster),
        f.writer_handle.clone(),
        consumer_config(1),
    );
    let _workers = pool.start(vec![7], f.cancel.clone());

    for i in 0..5 {
        assert!(f.producer.publish(&message(7, &format!("m{i}"))).await);
    }

    wait_for(|| transport.frames().len() == 5).await;
    let order: Vec<String> = transport
        .frames()
        .iter()
        .map(|frame| QueueMessage::from_json(frame).unwrap().message_id)
        .collect();
    assert_eq!(order, vec!["m0", "m1", "m2", "m3", "m4"]);

    f.cancel.cancel();
}

#[tokio::test]
async fn malformed_body_is_never_acked() {
    let mut f = fixture(&[2], 100).await;
    tokio::spawn(f.writer.take().unwrap().run(f.cancel.clone()));

    let url = f.queue.get_queue_url("roomcast-room-2.fifo").await.unwrap();
    f.queue
        .send(&url, "{not a queue message".into(), "2", "poison")
        .await
        .unwrap();

    let pool = ConsumerPool::new(
        Arc::clone(&f.producer),
        Arc::clone(&f.broadcaster),
        f.writer_handle.clone(),
        consumer_config(1),
    );
    let _workers = pool.start(vec![2], f.cancel.clone());

    wait_for(|| pool.metrics_snapshot().failed >= 1).await;
    f.cancel.cancel();

    // The poison message is still owned by the queue (in flight or, after
    // the visibility timeout, visible again); it was never deleted.
    let attrs = f.queue.attributes(&url).await.unwrap();
    assert_eq!(attrs.approx_messages + attrs.approx_not_visible, 1);
    assert_eq!(f.store.row_count(), 0);
}

#[tokio::test]
async fn full_writer_buffer_leaves_message_for_redelivery() {
    let mut f = fixture(&[3], 1).await;

    // Fill the writer buffer while its flusher is not running.
    assert!(f.writer_handle.enqueue(message(3, "filler")));
    assert_eq!(f.writer_handle.metrics_snapshot().buffer_size, 1);

    let pool = ConsumerPool::new(
        Arc::clone(&f.producer),
        Arc::clone(&f.broadcaster),
        f.writer_handle.clone(),
        consumer_config(1),
    );
    let _workers = pool.start(vec![3], f.cancel.clone());

    assert!(f.producer.publish(&message(3, "m1")).await);

    // The consumer saw the message but could not hand it over.
    wait_for(|| pool.metrics_snapshot().failed >= 1).await;
    assert_eq!(f.store.row_count(), 0);

    // Start the flusher; the buffer drains, and the visibility timeout
    // redelivers the unacked message, which now goes through.
    tokio::spawn(f.writer.take().unwrap().run(f.cancel.clone()));
    wait_for(|| f.store.row("m1").is_some()).await;
    wait_for(|| pool.metrics_snapshot().processed >= 1).await;

    f.cancel.cancel();
}

#[tokio::test]
async fn redelivered_message_is_persisted_once() {
    let mut f = fixture(&[4], 100).await;
    tokio::spawn(f.writer.take().unwrap().run(f.cancel.clone()));

    let pool = ConsumerPool::new(
        Arc::clone(&f.producer),
        Arc::clone(&f.broadcaster),
        f.writer_handle.clone(),
        consumer_config(1),
    );
    let _workers = pool.start(vec![4], f.cancel.clone());

    // Two deliveries of the same message, as after a partitioner handoff.
    // The in-memory queue's dedup window is bypassed by writing the same
    // body under two dedup ids.
    let url = f.queue.get_queue_url("roomcast-room-4.fifo").await.unwrap();
    let body = message(4, "dup").to_json();
    f.queue.send(&url, body.clone(), "4", "d1").await.unwrap();
    f.queue.send(&url, body, "4", "d2").await.unwrap();

    wait_for(|| pool.metrics_snapshot().processed == 2).await;
    wait_for(|| f.store.row_count() == 1).await;
    assert_eq!(f.store.activity("42", 4).unwrap().message_count, 1);

    f.cancel.cancel();
}

#[tokio::test]
async fn worker_count_is_bounded_by_assigned_rooms() {
    let f = fixture(&[1, 2], 100).await;
    let pool = ConsumerPool::new(
        Arc::clone(&f.producer),
        Arc::clone(&f.broadcaster),
        f.writer_handle.clone(),
        consumer_config(40),
    );

    let workers = pool.start(vec![1, 2], f.cancel.clone());
    assert_eq!(workers.len(), 2);
    f.cancel.cancel();
}

#[tokio::test]
async fn disabled_consumer_spawns_nothing() {
    let f = fixture(&[1], 100).await;
    let pool = ConsumerPool::new(
        Arc::clone(&f.producer),
        Arc::clone(&f.broadcaster),
        f.writer_handle.clone(),
        ConsumerConfig {
            enabled: false,
            ..consumer_config(1)
        },
    );
    assert!(pool.start(vec![1], f.cancel.clone()).is_empty());
}
