//! In-memory `UveCacheClient` fake, grounded on the donor's hashmap-backed
//! storage-engine fake idiom: a `DashMap` standing in for the real
//! backend, with test-only seeding methods alongside the trait impl.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use alarmgen_core::UveKey;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value as JsonValue;

use super::{PartialReadResult, ProducerEndpoint, UveCacheClient};

/// Deterministic in-memory cache: UVE contents and producer list are
/// seeded directly by the test, `partial_read` pulls from the same
/// seeded contents filtered by a caller-supplied partition/producer
/// predicate function.
#[derive(Default)]
pub struct FakeUveCacheClient {
    contents: DashMap<UveKey, BTreeMap<String, JsonValue>>,
    producers: DashMap<ProducerEndpoint, BTreeSet<UveKey>>,
    force_partial_read_failure: AtomicBool,
}

impl FakeUveCacheClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces (or inserts) the full contents mapping for one UVE.
    pub fn seed(&self, uve_key: UveKey, mapping: BTreeMap<String, JsonValue>) {
        self.contents.insert(uve_key, mapping);
    }

    pub fn remove_uve(&self, uve_key: &UveKey) {
        self.contents.remove(uve_key);
    }

    /// Registers a producer endpoint and the set of UVEs it owns, used by
    /// `list_producers`/`partial_read`.
    pub fn seed_producer(&self, producer: ProducerEndpoint, owned_uves: BTreeSet<UveKey>) {
        self.producers.insert(producer, owned_uves);
    }

    pub fn remove_producer(&self, producer: &ProducerEndpoint) {
        self.producers.remove(producer);
    }

    /// Forces the next `get` calls to report the failure flag, simulating
    /// a partial/degraded read.
    pub fn set_force_partial_read_failure(&self, force: bool) {
        self.force_partial_read_failure.store(force, Ordering::SeqCst);
    }
}

#[async_trait]
impl UveCacheClient for FakeUveCacheClient {
    async fn get(
        &self,
        uve_key: &UveKey,
        filters: Option<&BTreeSet<String>>,
    ) -> (bool, BTreeMap<String, JsonValue>) {
        let failure = self.force_partial_read_failure.load(Ordering::SeqCst);
        let full = self
            .contents
            .get(uve_key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        let mapping = match filters {
            None => full,
            Some(wanted) => full
                .into_iter()
                .filter(|(struct_type, _)| wanted.contains(struct_type))
                .collect(),
        };
        (failure, mapping)
    }

    async fn list_producers(&self) -> BTreeSet<ProducerEndpoint> {
        self.producers.iter().map(|entry| entry.key().clone()).collect()
    }

    async fn partial_read(&self, _partition: u32, producer: &ProducerEndpoint) -> PartialReadResult {
        let collector_id = format!("{}:{}", producer.ip, producer.port);
        let owned = self
            .producers
            .get(producer)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        let mut contents = BTreeMap::new();
        for uve_key in owned {
            if let Some(entry) = self.contents.get(&uve_key) {
                contents.insert(uve_key, entry.value().clone());
            }
        }
        (collector_id, contents)
    }
}
