//! Serve command - run a fabric node
//!
//! Explicit wiring at startup: each component is constructed with its
//! configuration and collaborators, spawned, and joined in dependency
//! order on shutdown. No registry, no reflection.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use roomcast_config::{Config, QueueMode};
use roomcast_metrics::{IngressMetrics, Reporter, SnapshotSources};
use roomcast_persist::{
    BatchWriter, DeadLetterSink, MessageStore, NoopStore, PostgresStore,
};
use roomcast_pipeline::{partitioner, BatchPublisher, ConsumerPool, QueueProducer};
use roomcast_queue::{InMemoryQueue, QueueClient};
use roomcast_session::{Broadcaster, RoomRegistry, WriteSerializer};

use crate::http;
use crate::state::{AppState, ProducerMode};

/// A fully wired node, before the listener is bound.
pub struct Fabric {
    pub state: AppState,
    pub cancel: CancellationToken,
    pub serializer_tasks: Vec<JoinHandle<()>>,
    pub consumer_tasks: Vec<JoinHandle<()>>,
    pub writer_task: JoinHandle<()>,
    pub publisher_task: Option<JoinHandle<()>>,
    pub reporter_task: Option<JoinHandle<()>>,
}

/// Run the serve command.
pub async fn run(config_path: Option<PathBuf>) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        "roomcast starting"
    );

    let config = load_config(config_path)?;

    let queue_client = build_queue_client(&config).await?;
    let fabric = build_fabric(config, queue_client).await?;

    let bind_addr = fabric.state.config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!(
        addr = %bind_addr,
        node_id = %fabric.state.config.node.node_id,
        rooms = fabric.state.config.node.rooms,
        assigned_rooms = fabric.state.assigned_rooms.len(),
        "roomcast listening"
    );

    let app = http::router(fabric.state.clone());
    let server_cancel = fabric.cancel.clone();
    let server_task = tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            server_cancel.cancelled().await;
        })
        .await
        .unwrap_or_else(|e| error!(error = %e, "server error"));
    });

    wait_for_shutdown().await;
    info!("shutdown signal received, stopping node");

    shutdown(fabric, server_task).await;

    info!("roomcast shutdown complete");
    Ok(())
}

/// Load configuration, falling back to defaults when no file is found.
fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            info!(config = %path.display(), "using config file");
            Config::from_file(&path).context("failed to load configuration")
        }
        None => {
            let default_paths = [
                PathBuf::from("configs/roomcast.toml"),
                PathBuf::from("roomcast.toml"),
            ];
            for candidate in &default_paths {
                if candidate.exists() {
                    info!(config = %candidate.display(), "using config file");
                    return Config::from_file(candidate).context("failed to load configuration");
                }
            }
            info!("no config file found, using defaults (single node, in-process queue)");
            Ok(Config::default())
        }
    }
}

/// Construct the queue client for the configured mode.
///
/// In-memory mode provisions the room queues and the DLQ up front, the way
/// an operator would provision them in the hosted service.
pub async fn build_queue_client(config: &Config) -> Result<Arc<dyn QueueClient>> {
    match config.queue.mode {
        QueueMode::Memory => {
            let queue = InMemoryQueue::new();
            for room_id in 1..=config.node.rooms {
                queue.create_queue(&config.queue.queue_name(room_id)).await;
            }
            if config.dlq.enabled {
                queue.create_queue(&config.dlq.queue_name).await;
            }
            info!(rooms = config.node.rooms, "in-process queue provisioned");
            Ok(Arc::new(queue))
        }
        QueueMode::External => anyhow::bail!(
            "queue.mode = \"external\" requires the hosted queue client, \
             which is deployed as a separate binding; this build ships the \
             in-process queue only"
        ),
    }
}

/// Wire every component of the node.
pub async fn build_fabric(config: Config, queue_client: Arc<dyn QueueClient>) -> Result<Fabric> {
    let config = Arc::new(config);
    let cancel = CancellationToken::new();

    // Store: Postgres when configured, otherwise the null object.
    let store: Arc<dyn MessageStore> = match &config.database.url {
        Some(url) => Arc::new(
            PostgresStore::connect(url, config.database.effective_max_connections())
                .await
                .context("failed to connect to database")?,
        ),
        None => {
            warn!("no database configured, messages will be broadcast but not persisted");
            Arc::new(NoopStore)
        }
    };

    // Write path: registry, shared serializer pool, broadcaster.
    let registry = Arc::new(RoomRegistry::new());
    let (serializer, serializer_tasks) = WriteSerializer::start(
        Arc::clone(&registry),
        config.write_serializer.worker_threads,
        cancel.clone(),
    );
    let broadcaster = Arc::new(Broadcaster::new(
        Arc::clone(&registry),
        Arc::clone(&serializer),
        config.broadcast.exclude_sender,
    ));

    // Persistence: DLQ sink, batch writer, flusher task.
    let dlq = Arc::new(DeadLetterSink::new(
        Arc::clone(&queue_client),
        config.dlq.queue_name.clone(),
        config.dlq.enabled,
    ));
    let (batch_writer, writer_handle) = BatchWriter::new(
        config.batch_writer.clone(),
        Arc::clone(&store),
        Arc::clone(&dlq),
    );
    let writer_task = tokio::spawn(batch_writer.run(cancel.clone()));

    // Producer: single-send, optionally fronted by the micro-batcher.
    let producer = Arc::new(QueueProducer::new(
        Arc::clone(&queue_client),
        config.queue.clone(),
    ));
    let (producer_mode, batch_publisher, publisher_task) = if config.producer.batch.enabled {
        let publisher = Arc::new(BatchPublisher::new(
            Arc::clone(&producer),
            config.producer.batch.clone(),
            config.node.rooms,
        ));
        let task = tokio::spawn(Arc::clone(&publisher).run(cancel.clone()));
        (
            ProducerMode::Batched(Arc::clone(&publisher)),
            Some(publisher),
            Some(task),
        )
    } else {
        (ProducerMode::Single(Arc::clone(&producer)), None, None)
    };

    // Consumers over the rooms this node owns.
    let assigned_rooms = Arc::new(partitioner::assigned_rooms(
        &config.node.node_id,
        &config.node.node_list,
        config.node.rooms,
    ));
    let consumer = ConsumerPool::new(
        Arc::clone(&producer),
        Arc::clone(&broadcaster),
        writer_handle.clone(),
        config.consumer.clone(),
    );
    let consumer_tasks = consumer.start((*assigned_rooms).clone(), cancel.clone());

    let ingress = Arc::new(IngressMetrics::new());
    let sources = Arc::new(SnapshotSources {
        ingress: Arc::clone(&ingress),
        registry: Arc::clone(&registry),
        serializer: Arc::clone(&serializer),
        broadcaster: Arc::clone(&broadcaster),
        producer: Arc::clone(&producer),
        batch_publisher,
        consumer: Arc::clone(&consumer),
        batch_writer: writer_handle,
        dlq,
    });

    let reporter_task = if config.metrics.enabled {
        let reporter = Reporter::new(Arc::clone(&sources), config.metrics.interval());
        Some(tokio::spawn(reporter.run(cancel.clone())))
    } else {
        None
    };

    Ok(Fabric {
        state: AppState {
            config,
            ingress,
            registry,
            serializer,
            producer,
            producer_mode: Arc::new(producer_mode),
            consumer,
            store,
            sources,
            assigned_rooms,
        },
        cancel,
        serializer_tasks,
        consumer_tasks,
        writer_task,
        publisher_task,
        reporter_task,
    })
}

/// Stop components in dependency order, bounding each wait.
async fn shutdown(fabric: Fabric, server_task: JoinHandle<()>) {
    let timeout = Duration::from_secs(fabric.state.config.server.shutdown_timeout_secs);
    fabric.cancel.cancel();

    // Ingress first: no new frames once the listener drains.
    join_with_timeout("server", server_task, timeout).await;

    // Consumers exit after their current receive.
    info!("waiting for consumers to stop");
    for task in fabric.consumer_tasks {
        join_with_timeout("consumer worker", task, timeout).await;
    }

    // Producer flushes pending batches before the writer drains.
    if let Some(task) = fabric.publisher_task {
        join_with_timeout("batch publisher", task, timeout).await;
    }

    // The batch writer drains its buffer and flushes the final batch.
    info!("waiting for batch writer to drain");
    join_with_timeout("batch writer", fabric.writer_task, timeout).await;

    for task in fabric.serializer_tasks {
        join_with_timeout("write worker", task, Duration::from_secs(1)).await;
    }
    if let Some(task) = fabric.reporter_task {
        join_with_timeout("metrics reporter", task, Duration::from_secs(1)).await;
    }
}

async fn join_with_timeout(name: &str, task: JoinHandle<()>, timeout: Duration) {
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(component = name, error = %e, "task panicked during shutdown"),
        Err(_) => warn!(component = name, "task did not stop within timeout"),
    }
}

/// Wait for ctrl-c (or SIGTERM on unix).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
    }
}
