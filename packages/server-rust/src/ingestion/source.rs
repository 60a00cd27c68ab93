//! The stream-reader half of Component D: decodes a partition's named
//! change-notification shard (`uve-{p}`) into [`IngestionBatch`]es, upstream
//! of [`super::PartitionIngestionWorker`]. Mirrors the `UveCacheClient`/
//! `AlarmgenPublisher` shape: one trait boundary, an in-memory fake for
//! tests, a production client behind a feature flag.

#[cfg(feature = "kafka")]
pub mod kafka_source;

use alarmgen_core::{IngestionError, NotifHint, UveKey};
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::IngestionBatch;

/// Contract to the external per-partition change-notification stream. The
/// concrete broker client is an external collaborator; only this trait
/// boundary is in scope.
#[async_trait]
pub trait IngestionSource: Send + Sync + 'static {
    /// Blocks until the next batch for `partition` is available, or
    /// returns an error if the read failed. A worker retries after a short
    /// backoff on error rather than treating it as fatal.
    async fn read_batch(&self, partition: u32) -> Result<IngestionBatch, IngestionError>;
}

/// In-memory source fed by [`Self::push`], used by tests and by
/// deployments with no-discovery / single-process configuration where
/// nothing is actually queued externally.
#[derive(Default)]
pub struct FakeIngestionSource {
    queued: Mutex<std::collections::VecDeque<(u32, UveKey, NotifHint)>>,
}

impl FakeIngestionSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, partition: u32, uve_key: UveKey, hint: NotifHint) {
        self.queued.lock().await.push_back((partition, uve_key, hint));
    }
}

#[async_trait]
impl IngestionSource for FakeIngestionSource {
    async fn read_batch(&self, partition: u32) -> Result<IngestionBatch, IngestionError> {
        let mut queued = self.queued.lock().await;
        let mut entries = Vec::new();
        let mut remaining = std::collections::VecDeque::new();
        while let Some((p, key, hint)) = queued.pop_front() {
            if p == partition {
                entries.push((key, hint));
            } else {
                remaining.push_back((p, key, hint));
            }
        }
        *queued = remaining;
        if entries.is_empty() {
            // No work queued; park briefly so the caller's read loop does
            // not spin.
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        Ok(IngestionBatch { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_then_read_returns_pushed_entry() {
        let source = FakeIngestionSource::new();
        let key = UveKey::new("ObjectVRouter", "vr1");
        source.push(0, key.clone(), NotifHint::Null).await;

        let batch = source.read_batch(0).await.unwrap();
        assert_eq!(batch.entries, vec![(key, NotifHint::Null)]);
    }

    #[tokio::test]
    async fn read_ignores_entries_for_other_partitions() {
        let source = FakeIngestionSource::new();
        let key = UveKey::new("ObjectVRouter", "vr1");
        source.push(1, key.clone(), NotifHint::Null).await;

        let batch = source.read_batch(0).await.unwrap();
        assert!(batch.entries.is_empty());

        let batch = source.read_batch(1).await.unwrap();
        assert_eq!(batch.entries, vec![(key, NotifHint::Null)]);
    }
}
