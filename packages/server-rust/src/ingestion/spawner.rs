//! Concrete [`PartitionWorkerSpawner`]: builds one [`PartitionIngestionWorker`]
//! per acquired partition, bridges the manager's `CancellationToken` into
//! the generic `BackgroundWorker`'s shutdown `watch` channel, and retains a
//! snapshot handle per partition for `PartitionStatus` introspection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::cache::UveCacheClient;
use crate::partition::{PartitionQueue, PartitionWorkerSpawner};
use crate::service::BackgroundWorker;

use super::source::IngestionSource;
use super::worker::{IngestionCounters, PartitionIngestionWorker};

/// Read-only view of one partition's ingestion worker, retained after the
/// worker itself has been moved into its background task.
pub struct PartitionIngestionSnapshot {
    offset: Arc<AtomicU64>,
    counters: Arc<IngestionCounters>,
}

impl PartitionIngestionSnapshot {
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn counters(&self) -> &IngestionCounters {
        &self.counters
    }
}

pub struct IngestionWorkerSpawner {
    cache: Arc<dyn UveCacheClient>,
    source: Arc<dyn IngestionSource>,
    snapshots: Arc<DashMap<u32, Arc<PartitionIngestionSnapshot>>>,
    tick_interval: Duration,
}

impl IngestionWorkerSpawner {
    #[must_use]
    pub fn new(cache: Arc<dyn UveCacheClient>, source: Arc<dyn IngestionSource>, tick_interval: Duration) -> Self {
        Self {
            cache,
            source,
            snapshots: Arc::new(DashMap::new()),
            tick_interval,
        }
    }

    /// Snapshots for every partition this spawner currently has a worker
    /// running for, read by the `PartitionStatus` introspection handler.
    #[must_use]
    pub fn snapshot(&self, partition: u32) -> Option<Arc<PartitionIngestionSnapshot>> {
        self.snapshots.get(&partition).map(|entry| entry.value().clone())
    }
}

impl PartitionWorkerSpawner for IngestionWorkerSpawner {
    fn spawn(
        &self,
        partition: u32,
        queue: Arc<PartitionQueue>,
        stop: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let offset = Arc::new(AtomicU64::new(0));
        let counters = Arc::new(IngestionCounters::new());
        self.snapshots.insert(
            partition,
            Arc::new(PartitionIngestionSnapshot { offset: offset.clone(), counters: counters.clone() }),
        );

        let worker = PartitionIngestionWorker::with_offset(
            partition,
            queue,
            self.cache.clone(),
            counters,
            offset,
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let background = BackgroundWorker::spawn(worker, 256, self.tick_interval, shutdown_rx);
        let sender = background.sender();

        let bridge_stop = stop.clone();
        tokio::spawn(async move {
            bridge_stop.cancelled().await;
            let _ = shutdown_tx.send(true);
        });

        let reader_stop = stop.clone();
        let source = self.source.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = reader_stop.cancelled() => break,
                    batch = source.read_batch(partition) => {
                        match batch {
                            Ok(batch) => {
                                if !batch.entries.is_empty() && sender.send(batch).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => {
                                warn!(partition, error = %err, "ingestion stream read failed, backing off");
                                tokio::time::sleep(Duration::from_millis(500)).await;
                            }
                        }
                    }
                }
            }
        });

        let snapshots = self.snapshots.clone();
        tokio::spawn(async move {
            let _ = background.join().await;
            snapshots.remove(&partition);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FakeUveCacheClient;
    use crate::ingestion::source::FakeIngestionSource;
    use alarmgen_core::{NotifHint, UveKey};

    #[tokio::test]
    async fn spawned_worker_processes_pushed_batches() {
        let cache = Arc::new(FakeUveCacheClient::new());
        let source = Arc::new(FakeIngestionSource::new());
        let spawner = IngestionWorkerSpawner::new(cache, source.clone(), Duration::from_millis(20));

        let queue = Arc::new(PartitionQueue::new());
        let stop = CancellationToken::new();
        let handle = spawner.spawn(0, queue.clone(), stop.clone());

        let key = UveKey::new("ObjectVRouter", "vr1");
        source.push(0, key.clone(), NotifHint::Null).await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        let pending = queue.swap_out();
        assert_eq!(pending.get("ObjectVRouter:vr1"), Some(&NotifHint::Null));

        let snapshot = spawner.snapshot(0).unwrap();
        assert!(snapshot.offset() >= 1);

        stop.cancel();
        let _ = handle.await;
    }
}
