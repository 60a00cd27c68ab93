//! HTTP handler definitions for the alarm-generator's introspection
//! server: `AppState` (the shared state carried through axum extractors)
//! plus health/liveness/readiness, re-exported for convenient use when
//! building the router.

pub mod health;

pub use health::{health_handler, liveness_handler, readiness_handler};

use std::sync::Arc;
use std::time::Instant;

use crate::compression::StateCompressionLoop;
use crate::config::AlarmGenConfig;
use crate::ingestion::IngestionWorkerSpawner;
use crate::partition::PartitionManager;

use super::ShutdownController;

/// Shared application state passed to all axum handlers via `State`
/// extraction. Holds `Arc` references to shared resources so cloning is
/// cheap.
#[derive(Clone)]
pub struct AppState {
    /// Graceful shutdown controller with health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Owns the `unowned/acquiring/owned/releasing` state machine and the
    /// per-partition queues; introspection reads it, never writes it
    /// except via the administrative partition-ownership override.
    pub partition_manager: Arc<PartitionManager>,
    /// Exposes per-partition ingestion offset/counters snapshots.
    pub ingestion_spawner: Arc<IngestionWorkerSpawner>,
    /// Owns `ptab_info`/`tab_alarms`/`tab_perf`, the data the UVE-table
    /// introspection requests read.
    pub compression: Arc<StateCompressionLoop>,
    /// This instance's configuration (partition count, configured tables).
    pub config: Arc<AlarmGenConfig>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
