//! The ingestion worker proper: fills in the donor's `BackgroundRunnable`
//! scaffold (`service/worker.rs`) with `Task = IngestionBatch`.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alarmgen_core::{NotifHint, UveKey};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::cache::{ProducerEndpoint, UveCacheClient};
use crate::partition::PartitionQueue;
use crate::service::BackgroundRunnable;

/// One batch of change notifications read from the ingestion stream,
/// already decoded into `(uve-key, struct-type-hint-set | null)` pairs.
/// Decoding the wire payload itself is the stream reader's job, upstream
/// of this worker; the worker's contract starts at this decoded shape.
pub struct IngestionBatch {
    pub entries: Vec<(UveKey, NotifHint)>,
}

/// Per-producer per-table update counts (`notifs`) and per-table
/// per-UVE-key update counts (`keys`), exposed through introspection.
#[derive(Default)]
pub struct IngestionCounters {
    notifs: DashMap<(String, String), u64>,
    keys: DashMap<(String, String), u64>,
}

impl IngestionCounters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, producer_id: &str, uve_key: &UveKey) {
        *self
            .notifs
            .entry((producer_id.to_string(), uve_key.table.clone()))
            .or_insert(0) += 1;
        *self
            .keys
            .entry((uve_key.table.clone(), uve_key.name.clone()))
            .or_insert(0) += 1;
    }

    #[must_use]
    pub fn notifs_for(&self, producer_id: &str, table: &str) -> u64 {
        self.notifs
            .get(&(producer_id.to_string(), table.to_string()))
            .map_or(0, |entry| *entry.value())
    }

    #[must_use]
    pub fn key_updates_for(&self, table: &str, name: &str) -> u64 {
        self.keys
            .get(&(table.to_string(), name.to_string()))
            .map_or(0, |entry| *entry.value())
    }
}

/// Per owned partition, consumes decoded batches and reconciles producer
/// membership. One instance per partition, spawned by the Partition
/// Manager on acquisition.
pub struct PartitionIngestionWorker {
    partition: u32,
    queue: Arc<PartitionQueue>,
    cache: Arc<dyn UveCacheClient>,
    offset: Arc<AtomicU64>,
    known_producers: Mutex<BTreeSet<ProducerEndpoint>>,
    producer_uves: DashMap<ProducerEndpoint, BTreeSet<UveKey>>,
    counters: Arc<IngestionCounters>,
}

impl PartitionIngestionWorker {
    #[must_use]
    pub fn new(
        partition: u32,
        queue: Arc<PartitionQueue>,
        cache: Arc<dyn UveCacheClient>,
        counters: Arc<IngestionCounters>,
    ) -> Self {
        Self::with_offset(partition, queue, cache, counters, Arc::new(AtomicU64::new(0)))
    }

    /// As [`Self::new`] but shares `offset` with the caller, so a spawner
    /// can read the last-processed position for `PartitionStatus` without
    /// holding a reference into the worker itself (which is moved into the
    /// background task loop).
    #[must_use]
    pub fn with_offset(
        partition: u32,
        queue: Arc<PartitionQueue>,
        cache: Arc<dyn UveCacheClient>,
        counters: Arc<IngestionCounters>,
        offset: Arc<AtomicU64>,
    ) -> Self {
        Self {
            partition,
            queue,
            cache,
            offset,
            known_producers: Mutex::new(BTreeSet::new()),
            producer_uves: DashMap::new(),
            counters,
        }
    }

    /// Last processed position, observable via `PartitionStatus`.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn counters(&self) -> Arc<IngestionCounters> {
        self.counters.clone()
    }

    /// Compares the producer set currently tracked against
    /// `list_producers()`: newly-seen producers get a full re-read
    /// enqueued for each of their UVEs, departed producers have deletions
    /// synthesized for every UVE they were last known to own.
    pub async fn resource_check(&self) {
        let current = self.cache.list_producers().await;
        let mut known = self.known_producers.lock();
        let added: Vec<ProducerEndpoint> = current.difference(&known).cloned().collect();
        let departed: Vec<ProducerEndpoint> = known.difference(&current).cloned().collect();
        *known = current;
        drop(known);

        for producer in &added {
            let (collector_id, contents) =
                self.cache.partial_read(self.partition, producer).await;
            info!(
                partition = self.partition,
                collector_id, producer = ?producer, uve_count = contents.len(),
                "new producer observed, enqueueing full re-read"
            );
            let mut owned = BTreeSet::new();
            for uve_key in contents.keys() {
                self.queue.merge(uve_key.to_string(), NotifHint::Null);
                self.counters.record(&collector_id, uve_key);
                owned.insert(uve_key.clone());
            }
            self.producer_uves.insert(producer.clone(), owned);
        }

        for producer in &departed {
            let Some((_, owned_uves)) = self.producer_uves.remove(producer) else {
                warn!(partition = self.partition, producer = ?producer, "departed producer had no tracked UVEs");
                continue;
            };
            for uve_key in owned_uves {
                self.queue.merge(uve_key.to_string(), NotifHint::Null);
            }
        }
    }
}

#[async_trait]
impl BackgroundRunnable for PartitionIngestionWorker {
    type Task = IngestionBatch;

    async fn run(&mut self, task: IngestionBatch) {
        for (uve_key, hint) in task.entries {
            self.offset.fetch_add(1, Ordering::SeqCst);
            self.counters.record("unknown", &uve_key);
            self.queue.merge(uve_key.to_string(), hint);
        }
    }

    async fn on_tick(&mut self) {
        self.resource_check().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FakeUveCacheClient;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn run_merges_entries_and_advances_offset() {
        let queue = Arc::new(PartitionQueue::new());
        let cache = Arc::new(FakeUveCacheClient::new());
        let counters = Arc::new(IngestionCounters::new());
        let mut worker = PartitionIngestionWorker::new(0, queue.clone(), cache, counters.clone());

        let key = UveKey::new("ObjectVRouter", "vr1");
        worker
            .run(IngestionBatch {
                entries: vec![(key.clone(), NotifHint::Null)],
            })
            .await;

        assert_eq!(worker.offset(), 1);
        assert_eq!(counters.key_updates_for("ObjectVRouter", "vr1"), 1);
        let pending = queue.swap_out();
        assert_eq!(pending.get("ObjectVRouter:vr1"), Some(&NotifHint::Null));
    }

    #[tokio::test]
    async fn resource_check_enqueues_full_reread_for_new_producer() {
        let queue = Arc::new(PartitionQueue::new());
        let cache = Arc::new(FakeUveCacheClient::new());
        let key = UveKey::new("ObjectVRouter", "vr1");
        cache.seed(key.clone(), BTreeMap::from([("CpuInfo".to_string(), serde_json::json!(1))]));
        let producer = ProducerEndpoint { ip: "10.0.0.1".into(), port: 9000, pid: 1 };
        cache.seed_producer(producer.clone(), BTreeSet::from([key.clone()]));

        let counters = Arc::new(IngestionCounters::new());
        let worker = PartitionIngestionWorker::new(0, queue.clone(), cache, counters);

        worker.resource_check().await;

        let pending = queue.swap_out();
        assert_eq!(pending.get("ObjectVRouter:vr1"), Some(&NotifHint::Null));
    }

    #[tokio::test]
    async fn resource_check_synthesizes_deletions_for_departed_producer() {
        let queue = Arc::new(PartitionQueue::new());
        let cache = Arc::new(FakeUveCacheClient::new());
        let key = UveKey::new("ObjectVRouter", "vr1");
        cache.seed(key.clone(), BTreeMap::from([("CpuInfo".to_string(), serde_json::json!(1))]));
        let producer = ProducerEndpoint { ip: "10.0.0.1".into(), port: 9000, pid: 1 };
        cache.seed_producer(producer.clone(), BTreeSet::from([key.clone()]));

        let counters = Arc::new(IngestionCounters::new());
        let worker = PartitionIngestionWorker::new(0, queue.clone(), cache.clone(), counters);
        worker.resource_check().await;
        let _ = queue.swap_out();

        cache.remove_producer(&producer);
        worker.resource_check().await;

        let pending = queue.swap_out();
        assert_eq!(pending.get("ObjectVRouter:vr1"), Some(&NotifHint::Null));
    }
}
