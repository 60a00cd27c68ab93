//! Process entry point: loads configuration, wires every collaborator
//! (cache client, ingestion source, publisher, alarm registry, partition
//! manager, ingestion spawner, state-compression loop, telemetry), starts
//! the introspection HTTP server, and runs until SIGINT/SIGTERM triggers
//! a graceful, drain-then-exit shutdown.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use alarmgen_server::alarm::AlarmPluginRegistry;
use alarmgen_server::cache::FakeUveCacheClient;
#[cfg(feature = "cache-redis")]
use alarmgen_server::cache::RedisUveCacheClient;
use alarmgen_server::cache::UveCacheClient;
use alarmgen_server::compression::StateCompressionLoop;
use alarmgen_server::config::AlarmGenConfig;
use alarmgen_server::ingestion::{FakeIngestionSource, IngestionSource, IngestionWorkerSpawner};
#[cfg(feature = "kafka")]
use alarmgen_server::publish::kafka_publisher::KafkaPublisher;
use alarmgen_server::publish::{AlarmgenPublisher, InMemoryPublisher};
use alarmgen_server::network::{NetworkConfig, NetworkModule};
use alarmgen_server::partition::{FakePartitionClient, PartitionClient, PartitionManager};
use alarmgen_server::telemetry::TelemetryReporter;
use alarmgen_server::{ManagedService, ServiceContext, ServiceRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(AlarmGenConfig::parse());
    init_tracing(&config);

    info!(worker_id = %config.worker_id, "starting alarmgen-server");

    let cache = build_cache_client(&config).await?;
    let publisher = build_publisher(&config)?;
    let alarms = Arc::new(AlarmPluginRegistry::new());

    // The manager needs a spawner (built from the cache and ingestion
    // source) before it exists, and the compression loop needs the
    // manager before it exists -- so build bottom-up: cache/publisher,
    // then the ingestion spawner, then the partition manager, then the
    // compression loop that ties them together.
    let source = build_ingestion_source(&config);
    let ingestion_spawner = Arc::new(IngestionWorkerSpawner::new(
        cache.clone(),
        source,
        Duration::from_secs(5),
    ));
    let partition_manager = Arc::new(PartitionManager::new(
        ingestion_spawner.clone(),
        config.partition_transition_timeout(),
    ));
    let compression = Arc::new(StateCompressionLoop::new(
        partition_manager.clone(),
        cache,
        alarms,
        publisher,
        &config.worker_id,
        config.http_port,
        config.loop_pacing_floor(),
    ));

    let registry = ServiceRegistry::new();
    let telemetry = TelemetryReporter::new(compression.clone());
    registry.register(telemetry);
    registry.register(CompressionService::new(compression.clone()));

    let ctx = ServiceContext {
        config: config.clone(),
    };
    registry.init_all(&ctx).await?;

    let partition_client = FakePartitionClient::new(partition_manager.clone());
    partition_client
        .update_cluster_list(effective_peers(&config))
        .await;
    deliver_static_ownership(&partition_client, &config).await;

    let network_config = NetworkConfig {
        host: config.http_host.clone(),
        port: config.http_port,
        ..NetworkConfig::default()
    };
    let mut network = NetworkModule::new(network_config);
    let bound_port = network.start().await?;
    info!(port = bound_port, "introspection server listening");

    let router = network
        .build_router(
            partition_manager.clone(),
            ingestion_spawner.clone(),
            compression.clone(),
            config.clone(),
        )
        .merge(alarmgen_server::network::metrics::build_router());

    network.serve(router, shutdown_signal()).await?;

    registry.shutdown_all(false).await?;
    info!("alarmgen-server stopped");
    Ok(())
}

/// Waits for either SIGINT (Ctrl+C) or SIGTERM, whichever arrives first.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}

fn init_tracing(config: &AlarmGenConfig) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    match config.log_format {
        alarmgen_server::config::LogFormat::Json => subscriber.json().init(),
        alarmgen_server::config::LogFormat::Pretty => subscriber.init(),
    }
}

async fn build_cache_client(config: &AlarmGenConfig) -> anyhow::Result<Arc<dyn UveCacheClient>> {
    #[cfg(feature = "cache-redis")]
    if !config.cache_endpoints.is_empty() {
        let client =
            RedisUveCacheClient::connect(&config.cache_endpoints, &config.cache_password).await?;
        return Ok(Arc::new(client));
    }

    let _ = &config.cache_endpoints;
    Ok(Arc::new(FakeUveCacheClient::new()))
}

fn build_publisher(config: &AlarmGenConfig) -> anyhow::Result<Arc<dyn AlarmgenPublisher>> {
    #[cfg(feature = "kafka")]
    if !config.ingestion_brokers.is_empty() {
        let publisher = KafkaPublisher::new(
            &config.ingestion_brokers,
            config.publish_linger(),
            config.publish_timeout(),
        )?;
        return Ok(Arc::new(publisher));
    }

    let _ = &config.ingestion_brokers;
    Ok(Arc::new(InMemoryPublisher::new()))
}

fn build_ingestion_source(_config: &AlarmGenConfig) -> Arc<dyn IngestionSource> {
    // The Kafka ingestion source subscribes per-partition and is
    // constructed by the spawner on acquire in a future revision; until
    // then every deployment (including `--ingestion-brokers`) runs
    // against the in-memory fake, matching the no-discovery single-process
    // default this binary targets.
    Arc::new(FakeIngestionSource::new())
}

/// No-discovery peer list: the configured peers, or just this worker when
/// none are given (single-instance / dev mode).
fn effective_peers(config: &AlarmGenConfig) -> Vec<String> {
    if config.peers.is_empty() {
        vec![config.worker_id.clone()]
    } else {
        config.peers.clone()
    }
}

/// No-discovery ownership assignment: partition `p` belongs to
/// `peers[p % peers.len()]`. Delivers the owned set for this worker
/// through the same `PartitionOwnershipCallback` a real quorum client
/// would use.
async fn deliver_static_ownership(client: &FakePartitionClient, config: &AlarmGenConfig) {
    let peers = effective_peers(config);
    let Some(self_index) = peers.iter().position(|p| p == &config.worker_id) else {
        error!(worker_id = %config.worker_id, "worker id not present in its own peer list, owning no partitions");
        return;
    };

    let owned: BTreeSet<u32> = (0..config.partition_count)
        .filter(|p| (*p as usize) % peers.len() == self_index)
        .collect();

    info!(count = owned.len(), "assigned static partition ownership");
    client.deliver(owned).await;
}

/// Wraps [`StateCompressionLoop`] as a [`ManagedService`], driving its
/// periodic `run_iteration` on a fixed interval for as long as the
/// service is registered. Grounded on [`TelemetryReporter`]'s
/// spawn-on-init / cancel-on-shutdown pattern.
struct CompressionService {
    compression: Arc<StateCompressionLoop>,
    stop: tokio_util::sync::CancellationToken,
    handle: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl CompressionService {
    fn new(compression: Arc<StateCompressionLoop>) -> Self {
        Self {
            compression,
            stop: tokio_util::sync::CancellationToken::new(),
            handle: tokio::sync::Mutex::new(None),
        }
    }
}

#[async_trait]
impl ManagedService for CompressionService {
    fn name(&self) -> &'static str {
        "state-compression-loop"
    }

    async fn init(&self, ctx: &ServiceContext) -> anyhow::Result<()> {
        let compression = self.compression.clone();
        let stop = self.stop.clone();
        let pacing = ctx.config.loop_pacing_floor();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(pacing);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = stop.cancelled() => break,
                    _ = ticker.tick() => compression.run_iteration().await,
                }
            }
        });
        *self.handle.lock().await = Some(handle);
        Ok(())
    }

    async fn reset(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn shutdown(&self, _terminate: bool) -> anyhow::Result<()> {
        self.stop.cancel();
        if let Some(handle) = self.handle.lock().await.take() {
            let _ = handle.await;
        }
        Ok(())
    }
}
