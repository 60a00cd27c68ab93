//! Network module with deferred startup lifecycle.
//!
//! Implements the deferred startup pattern: `new()` creates resources,
//! `start()` binds the TCP listener, and `serve()` starts accepting
//! connections. This separation allows the rest of the application to
//! configure shared state (partition manager, compression loop, ingestion
//! spawner) between `start()` and `serve()`.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::compression::StateCompressionLoop;
use crate::config::AlarmGenConfig;
use crate::ingestion::IngestionWorkerSpawner;
use crate::introspect::{
    partition_ownership_handler, partition_status_handler, uve_table_alarm_handler,
    uve_table_info_handler, uve_table_perf_handler,
};
use crate::partition::PartitionManager;

use super::config::NetworkConfig;
use super::handlers::{health_handler, liveness_handler, readiness_handler, AppState};
use super::middleware::build_http_layers;
use super::shutdown::ShutdownController;

/// Manages the full introspection HTTP server lifecycle.
///
/// Follows the deferred startup pattern:
/// 1. `new()` -- allocates the shared shutdown controller
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- begins accepting connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            listener: None,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    /// Returns a shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router with every introspection route (§6, §9)
    /// plus the health/liveness/readiness probes.
    ///
    /// Routes:
    /// - `GET /health`, `/health/live`, `/health/ready`
    /// - `POST /introspect/partition-ownership`
    /// - `GET /introspect/partition-status/{partition}`
    /// - `GET /introspect/uve-table-info/{partition}`
    /// - `GET /introspect/uve-table-alarm/{table}`
    /// - `GET /introspect/uve-table-perf/{table}`
    #[must_use]
    pub fn build_router(
        &self,
        partition_manager: Arc<PartitionManager>,
        ingestion_spawner: Arc<IngestionWorkerSpawner>,
        compression: Arc<StateCompressionLoop>,
        app_config: Arc<AlarmGenConfig>,
    ) -> Router {
        let state = AppState {
            shutdown: Arc::clone(&self.shutdown),
            partition_manager,
            ingestion_spawner,
            compression,
            config: app_config,
            start_time: Instant::now(),
        };

        let layers = build_http_layers(&self.config);

        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .route(
                "/introspect/partition-ownership",
                post(partition_ownership_handler),
            )
            .route(
                "/introspect/partition-status/{partition}",
                get(partition_status_handler),
            )
            .route(
                "/introspect/uve-table-info/{partition}",
                get(uve_table_info_handler),
            )
            .route(
                "/introspect/uve-table-alarm/{table}",
                get(uve_table_alarm_handler),
            )
            .route(
                "/introspect/uve-table-perf/{table}",
                get(uve_table_perf_handler),
            )
            .layer(layers)
            .with_state(state)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Starts serving connections until the shutdown signal fires.
    ///
    /// Consumes `self` because the listener is moved into the server.
    /// Panics if `start()` was not called first.
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a fatal I/O error.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(
        self,
        router: Router,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .expect("start() must be called before serve()");
        let shutdown_ctrl = self.shutdown;
        let config = self.config;

        shutdown_ctrl.set_ready();

        if let Some(ref tls_config) = config.tls {
            serve_tls(listener, router, tls_config, shutdown_ctrl, shutdown).await
        } else {
            serve_plain(listener, router, shutdown_ctrl, shutdown).await
        }
    }
}

/// Serves plain HTTP connections using axum's built-in server.
async fn serve_plain(
    listener: TcpListener,
    router: Router,
    shutdown_ctrl: Arc<ShutdownController>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("Serving introspection HTTP server");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    drain(&shutdown_ctrl).await;
    Ok(())
}

/// Serves TLS connections using `axum-server` with rustls.
///
/// Reuses the pre-bound TCP listener by converting it to a `std::net::TcpListener`.
async fn serve_tls(
    listener: TcpListener,
    router: Router,
    tls_config: &super::config::TlsConfig,
    shutdown_ctrl: Arc<ShutdownController>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    use axum_server::tls_rustls::RustlsConfig;

    let rustls_config = RustlsConfig::from_pem_file(&tls_config.cert_path, &tls_config.key_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load TLS certificates: {e}"))?;

    let addr = listener.local_addr()?;
    let std_listener = listener.into_std()?;
    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();

    tokio::spawn(async move {
        shutdown.await;
        shutdown_handle.graceful_shutdown(None);
    });

    info!("Serving TLS introspection HTTP server on {}", addr);

    axum_server::from_tcp_rustls(std_listener, rustls_config)
        .handle(handle)
        .serve(router.into_make_service())
        .await?;

    drain(&shutdown_ctrl).await;
    Ok(())
}

/// Waits for in-flight requests to finish, then transitions to `Stopped`.
async fn drain(shutdown_ctrl: &Arc<ShutdownController>) {
    shutdown_ctrl.trigger_shutdown();
    let drained = shutdown_ctrl.wait_for_drain(Duration::from_secs(30)).await;
    if drained {
        info!("All in-flight requests drained successfully");
    } else {
        warn!("Drain timeout expired with in-flight requests remaining");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state_deps() -> (
        Arc<PartitionManager>,
        Arc<IngestionWorkerSpawner>,
        Arc<StateCompressionLoop>,
        Arc<AlarmGenConfig>,
    ) {
        use crate::alarm::AlarmPluginRegistry;
        use crate::cache::FakeUveCacheClient;
        use crate::ingestion::FakeIngestionSource;
        use crate::partition::{PartitionQueue, PartitionWorkerSpawner};
        use crate::publish::InMemoryPublisher;
        use clap::Parser;

        struct NoopSpawner;
        impl PartitionWorkerSpawner for NoopSpawner {
            fn spawn(
                &self,
                _partition: u32,
                _queue: Arc<PartitionQueue>,
                stop: tokio_util::sync::CancellationToken,
            ) -> tokio::task::JoinHandle<()> {
                tokio::spawn(async move {
                    stop.cancelled().await;
                })
            }
        }

        let cache = Arc::new(FakeUveCacheClient::new());
        let manager = Arc::new(PartitionManager::new(
            Arc::new(NoopSpawner),
            Duration::from_secs(1),
        ));
        let compression = Arc::new(StateCompressionLoop::new(
            manager.clone(),
            cache.clone(),
            Arc::new(AlarmPluginRegistry::new()),
            Arc::new(InMemoryPublisher::new()),
            "ag-1",
            8089,
            Duration::from_millis(500),
        ));
        let ingestion_spawner = Arc::new(IngestionWorkerSpawner::new(
            cache,
            Arc::new(FakeIngestionSource::new()),
            Duration::from_secs(5),
        ));
        let config = Arc::new(AlarmGenConfig::parse_from([
            "alarmgen-server",
            "--worker-id",
            "ag-1",
        ]));

        (manager, ingestion_spawner, compression, config)
    }

    #[test]
    fn new_creates_module_without_binding() {
        let module = NetworkModule::new(NetworkConfig::default());
        assert!(module.listener.is_none());
    }

    #[test]
    fn shutdown_controller_returns_shared_arc() {
        let module = NetworkModule::new(NetworkConfig::default());
        let s1 = module.shutdown_controller();
        let s2 = module.shutdown_controller();
        assert!(Arc::ptr_eq(&s1, &s2));
    }

    #[test]
    fn build_router_creates_router() {
        let module = NetworkModule::new(NetworkConfig::default());
        let (manager, spawner, compression, config) = test_state_deps();
        let _router = module.build_router(manager, spawner, compression, config);
    }

    #[tokio::test]
    async fn start_binds_to_os_assigned_port() {
        let mut module = NetworkModule::new(NetworkConfig::default());
        let port = module.start().await.expect("start should succeed");
        assert!(port > 0, "OS-assigned port should be > 0");
        assert!(module.listener.is_some());
    }

    #[tokio::test]
    #[should_panic(expected = "start() must be called before serve()")]
    async fn serve_panics_without_start() {
        let module = NetworkModule::new(NetworkConfig::default());
        let (manager, spawner, compression, config) = test_state_deps();
        let router = module.build_router(manager, spawner, compression, config);
        let _ = module.serve(router, std::future::pending::<()>()).await;
    }
}
