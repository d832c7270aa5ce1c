use std::sync::Arc;
use std::time::Duration;

use roomcast_config::{ProducerBatchConfig, QueueConfig};
use roomcast_protocol::{MessageKind, QueueMessage};
use roomcast_queue::{InMemoryQueue, QueueClient};
use tokio_util::sync::CancellationToken;

use crate::{BatchPublisher, QueueProducer};

fn message(room_id: u32, id: &str) -> QueueMessage {
    QueueMessage {
        message_id: id.into(),
        room_id,
        user_id: "42".into(),
        username: "alice".into(),
        message: "hi".into(),
        timestamp: "2025-01-01T00:00:00Z".into(),
        message_type: MessageKind::Text,
        server_id: "node-1".into(),
        client_ip: "10.0.0.1".into(),
    }
}

async fn fixture(batch: ProducerBatchConfig) -> (Arc<InMemoryQueue>, Arc<BatchPublisher>) {
    let queue = Arc::new(InMemoryQueue::new());
    for room in 1..=4u32 {
        queue.create_queue(&format!("roomcast-room-{room}.fifo")).await;
    }
    let producer = Arc::new(QueueProducer::new(
        queue.clone() as Arc<dyn QueueClient>,
        QueueConfig::default(),
    ));
    (queue, Arc::new(BatchPublisher::new(producer, batch, 4)))
}

async fn drain(queue: &InMemoryQueue, room: u32) -> Vec<String> {
    let url = queue
        .get_queue_url(&format!("roomcast-room-{room}.fifo"))
        .await
        .unwrap();
    queue
        .receive(&url, 10, Duration::ZERO, Duration::from_secs(30))
        .await
        .unwrap()
        .into_iter()
        .map(|m| QueueMessage::from_json(&m.body).unwrap().message_id)
        .collect()
}

#[tokio::test]
async fn publish_is_accepted_before_any_send() {
    let (queue, publisher) = fixture(ProducerBatchConfig {
        enabled: true,
        ..Default::default()
    })
    .await;

    assert!(publisher.publish(message(1, "m1")).await);
    assert_eq!(publisher.pending(1).await, 1);
    // Nothing on the wire until a flush happens.
    assert!(drain(&queue, 1).await.is_empty());
}

#[tokio::test]
async fn reaching_max_size_flushes_eagerly() {
    let (queue, publisher) = fixture(ProducerBatchConfig {
        enabled: true,
        max_size: 3,
        flush_ms: 60_000,
        room_capacity: 100,
    })
    .await;

    for i in 0..3 {
        publisher.publish(message(2, &format!("m{i}"))).await;
    }

    // The third publish triggered the send without waiting for the flusher.
    assert_eq!(publisher.pending(2).await, 0);
    assert_eq!(drain(&queue, 2).await, vec!["m0", "m1", "m2"]);
    let snapshot = publisher.metrics_snapshot();
    assert_eq!(snapshot.batches_sent, 1);
    assert_eq!(snapshot.messages_in_batches, 3);
}

#[tokio::test]
async fn interval_flusher_ships_partial_batches() {
    let (queue, publisher) = fixture(ProducerBatchConfig {
        enabled: true,
        max_size: 10,
        flush_ms: 30,
        room_capacity: 100,
    })
    .await;

    let cancel = CancellationToken::new();
    let flusher = tokio::spawn(Arc::clone(&publisher).run(cancel.clone()));

    publisher.publish(message(1, "a")).await;
    publisher.publish(message(3, "b")).await;

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(drain(&queue, 1).await, vec!["a"]);
    assert_eq!(drain(&queue, 3).await, vec!["b"]);

    cancel.cancel();
    flusher.await.unwrap();
}

#[tokio::test]
async fn full_room_batch_drops_message() {
    let (_queue, publisher) = fixture(ProducerBatchConfig {
        enabled: true,
        max_size: 10,
        flush_ms: 60_000,
        room_capacity: 2,
    })
    .await;

    assert!(publisher.publish(message(1, "a")).await);
    assert!(publisher.publish(message(1, "b")).await);
    assert!(!publisher.publish(message(1, "c")).await);
    assert_eq!(publisher.metrics_snapshot().dropped, 1);
}

#[tokio::test]
async fn out_of_range_room_is_rejected() {
    let (_queue, publisher) = fixture(ProducerBatchConfig {
        enabled: true,
        ..Default::default()
    })
    .await;
    assert!(!publisher.publish(message(99, "x")).await);
}

#[tokio::test]
async fn shutdown_flushes_everything_pending() {
    let (queue, publisher) = fixture(ProducerBatchConfig {
        enabled: true,
        max_size: 10,
        flush_ms: 60_000,
        room_capacity: 100,
    })
    .await;

    let cancel = CancellationToken::new();
    let flusher = tokio::spawn(Arc::clone(&publisher).run(cancel.clone()));

    for i in 0..5 {
        publisher.publish(message(4, &format!("m{i}"))).await;
    }

    // Neither trigger fired; the shutdown path must ship all five.
    cancel.cancel();
    flusher.await.unwrap();
    assert_eq!(publisher.pending(4).await, 0);
    assert_eq!(drain(&queue, 4).await.len(), 5);
}
