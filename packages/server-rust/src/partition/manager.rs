//! Partition Manager (§4.H): reacts to cluster-membership ownership
//! callbacks, spawns/stops per-partition ingestion workers, and tracks the
//! `unowned -> acquiring -> owned -> releasing -> unowned` state machine.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::client::{OwnedPartitions, PartitionOwnershipCallback};
use super::queue::PartitionQueue;

/// Per-partition ownership state. Only `Owned` is a state in which the
/// ingestion worker reads and the compression loop emits for this
/// partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionState {
    Unowned,
    Acquiring,
    Owned,
    Releasing,
}

/// Spawns the per-partition ingestion worker (Component D). Implemented by
/// the `ingestion` module; kept as a trait here so the partition manager
/// has no dependency on the ingestion worker's concrete type.
pub trait PartitionWorkerSpawner: Send + Sync + 'static {
    fn spawn(
        &self,
        partition: u32,
        queue: Arc<PartitionQueue>,
        stop: CancellationToken,
    ) -> tokio::task::JoinHandle<()>;
}

/// Everything the manager and the compression loop both need for one
/// owned (or transitioning) partition.
pub struct PartitionHandle {
    pub queue: Arc<PartitionQueue>,
    state: ArcSwap<PartitionState>,
    acquired_at_us: AtomicI64,
    healthy: AtomicBool,
    stop_token: CancellationToken,
    teardown_ack: Notify,
    worker: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl PartitionHandle {
    #[must_use]
    pub fn state(&self) -> PartitionState {
        **self.state.load()
    }

    #[must_use]
    pub fn acquired_at_us(&self) -> i64 {
        self.acquired_at_us.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

/// Owns the set of currently acquiring/owned/releasing partitions and
/// drives transitions from membership callbacks. The sole writer of
/// `_workers`/`_acq_time`/`_partset` (here: the `partitions` map).
pub struct PartitionManager {
    partitions: DashMap<u32, Arc<PartitionHandle>>,
    spawner: Arc<dyn PartitionWorkerSpawner>,
    transition_timeout: Duration,
    serialize: tokio::sync::Mutex<()>,
}

impl PartitionManager {
    #[must_use]
    pub fn new(spawner: Arc<dyn PartitionWorkerSpawner>, transition_timeout: Duration) -> Self {
        Self {
            partitions: DashMap::new(),
            spawner,
            transition_timeout,
            serialize: tokio::sync::Mutex::new(()),
        }
    }

    /// Currently owned partitions (state `Owned`), the set the compression
    /// loop iterates each pass.
    #[must_use]
    pub fn owned_partitions(&self) -> Vec<u32> {
        self.partitions
            .iter()
            .filter(|entry| entry.value().state() == PartitionState::Owned)
            .map(|entry| *entry.key())
            .collect()
    }

    #[must_use]
    pub fn handle(&self, partition: u32) -> Option<Arc<PartitionHandle>> {
        self.partitions.get(&partition).map(|entry| entry.value().clone())
    }

    /// Partitions whose queue has been marked for teardown but whose
    /// `ptab_info` the compression loop has not yet confirmed dropping.
    /// The compression loop calls this each iteration (step 1) before
    /// calling [`Self::finish_teardown`].
    #[must_use]
    pub fn partitions_pending_teardown(&self) -> Vec<(u32, Arc<PartitionHandle>)> {
        self.partitions
            .iter()
            .filter(|entry| entry.value().state() == PartitionState::Releasing)
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Called by the compression loop once it has freed `ptab_info[p]` and
    /// withdrawn `tab_alarms` for `p`. Wakes the membership task waiting in
    /// [`Self::apply_ownership_change`] and removes the partition entry,
    /// completing `releasing -> unowned`.
    pub fn finish_teardown(&self, partition: u32) {
        if let Some((_, handle)) = self.partitions.remove(&partition) {
            handle.teardown_ack.notify_one();
        }
    }

    /// Applies a new owned-partition list from a membership callback.
    /// Serializes with any concurrent callback so overlapping deliveries
    /// do not race on `added`/`removed` computation.
    pub async fn apply_ownership_change(&self, new_owned: OwnedPartitions) {
        let _guard = self.serialize.lock().await;

        let current: BTreeSet<u32> = self.partitions.iter().map(|entry| *entry.key()).collect();
        let added: Vec<u32> = new_owned.difference(&current).copied().collect();
        let removed: Vec<u32> = current.difference(&new_owned).copied().collect();

        for partition in added {
            self.acquire(partition).await;
        }
        for partition in removed {
            self.release(partition).await;
        }
    }

    async fn acquire(&self, partition: u32) {
        let queue = Arc::new(PartitionQueue::new());
        let stop_token = CancellationToken::new();
        let handle = Arc::new(PartitionHandle {
            queue: queue.clone(),
            state: ArcSwap::from_pointee(PartitionState::Acquiring),
            acquired_at_us: AtomicI64::new(monotonic_utc_micros()),
            healthy: AtomicBool::new(true),
            stop_token: stop_token.clone(),
            teardown_ack: Notify::new(),
            worker: tokio::sync::Mutex::new(None),
        });
        self.partitions.insert(partition, handle.clone());

        let worker_handle = self.spawner.spawn(partition, queue, stop_token);
        *handle.worker.lock().await = Some(worker_handle);

        // uveq[p] exists as soon as the handle is inserted; the ~60s wait
        // in the distilled spec is for a worker that populates it lazily.
        // Here it is immediate, but we still honor the timeout contract so
        // a future worker implementation that defers queue creation is
        // covered by the same acquire path.
        match tokio::time::timeout(self.transition_timeout, std::future::ready(())).await {
            Ok(()) => {
                handle.state.store(Arc::new(PartitionState::Owned));
                info!(partition, "partition acquired");
            }
            Err(_) => {
                handle.healthy.store(false, Ordering::SeqCst);
                error!(partition, "timed out waiting for partition queue to appear");
            }
        }
    }

    async fn release(&self, partition: u32) {
        let Some(handle) = self.partitions.get(&partition).map(|e| e.value().clone()) else {
            return;
        };
        handle.state.store(Arc::new(PartitionState::Releasing));
        handle.stop_token.cancel();

        if let Some(worker_handle) = handle.worker.lock().await.take() {
            if tokio::time::timeout(self.transition_timeout, worker_handle)
                .await
                .is_err()
            {
                warn!(partition, "ingestion worker did not stop within timeout");
            }
        }

        // Teardown flag: drop any pending notifications; the compression
        // loop is the one that frees ptab_info/tab_alarms for this
        // partition and then calls finish_teardown.
        handle.queue.mark_for_teardown();

        match tokio::time::timeout(self.transition_timeout, handle.teardown_ack.notified()).await
        {
            Ok(()) => info!(partition, "partition released"),
            Err(_) => {
                handle.healthy.store(false, Ordering::SeqCst);
                error!(
                    partition,
                    "timed out waiting for state-compression loop to tear down partition"
                );
            }
        }
    }
}

#[async_trait]
impl PartitionOwnershipCallback for PartitionManager {
    async fn on_ownership_changed(&self, owned: OwnedPartitions) {
        self.apply_ownership_change(owned).await;
    }
}

/// Monotonic-looking UTC microsecond timestamp for partition acquisition
/// bookkeeping. Not used for correctness, only observability (`coll` field
/// of published messages and `PartitionStatus`).
fn monotonic_utc_micros() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
