//! Self-telemetry (part of Component B, not a component of its own):
//! every 60s, rolls every table's live `TableStats` window into `previous`
//! so `UVETablePerf` always reports a just-completed window, and emits a
//! heartbeat span standing in for the out-of-scope process CPU/mem report.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::compression::StateCompressionLoop;
use crate::service::{ManagedService, ServiceContext};

const ROLLOVER_PERIOD: Duration = Duration::from_secs(60);

/// Drives the periodic rollover/heartbeat task for as long as the service
/// is alive. Holds no aggregation state of its own; `tab_perf` stays
/// exclusively owned by the compression loop (§5).
pub struct TelemetryReporter {
    compression: Arc<StateCompressionLoop>,
    stop: CancellationToken,
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl TelemetryReporter {
    #[must_use]
    pub fn new(compression: Arc<StateCompressionLoop>) -> Self {
        Self {
            compression,
            stop: CancellationToken::new(),
            handle: Mutex::new(None),
        }
    }

    async fn run_once(&self) {
        let mut tables_rolled = 0usize;
        for mut entry in self.compression.tab_perf().iter_mut() {
            let table = entry.key().clone();
            entry.value_mut().rollover();
            tables_rolled += 1;
            if let Some(prev) = entry.value().previous() {
                metrics::gauge!("alarmgen_table_get_time_us", "table" => table.clone())
                    .set(prev.avg_get_time_us() as f64);
                metrics::gauge!("alarmgen_table_pub_time_us", "table" => table.clone())
                    .set(prev.avg_pub_time_us() as f64);
                metrics::gauge!("alarmgen_table_call_time_us", "table" => table.clone())
                    .set(prev.avg_call_time_us() as f64);
                metrics::counter!("alarmgen_table_updates_total", "table" => table)
                    .increment(prev.updates);
            }
        }
        let owned_partitions = self.compression.ptab_info().len();
        metrics::gauge!("alarmgen_owned_partitions").set(owned_partitions as f64);
        info!(
            tables_rolled,
            owned_partitions,
            "alarmgen heartbeat"
        );
    }
}

#[async_trait]
impl ManagedService for TelemetryReporter {
    fn name(&self) -> &'static str {
        "telemetry"
    }

    async fn init(&self, _ctx: &ServiceContext) -> anyhow::Result<()> {
        let compression = self.compression.clone();
        let stop = self.stop.clone();
        let handle = tokio::spawn(async move {
            let reporter = TelemetryReporter { compression, stop: stop.clone(), handle: Mutex::new(None) };
            let mut ticker = tokio::time::interval(ROLLOVER_PERIOD);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = stop.cancelled() => break,
                    _ = ticker.tick() => reporter.run_once().await,
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
