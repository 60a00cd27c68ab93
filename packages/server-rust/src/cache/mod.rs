//! UVE Cache Client (§4.C): the trait boundary to the per-producer cache
//! that holds authoritative UVE contents, plus an in-memory fake for
//! tests. A production implementation lives behind the `cache-redis`
//! feature.

pub mod fake;
#[cfg(feature = "cache-redis")]
pub mod redis_client;

use std::collections::{BTreeMap, BTreeSet};

use alarmgen_core::UveKey;
use async_trait::async_trait;
use serde_json::Value as JsonValue;

pub use fake::FakeUveCacheClient;

/// One producer (generator) endpoint discovered via service discovery.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProducerEndpoint {
    pub ip: String,
    pub port: u16,
    pub pid: u32,
}

/// The subset of a UVE's contents belonging to one producer, read during
/// a partition reconcile.
pub type PartialReadResult = (String, BTreeMap<UveKey, BTreeMap<String, JsonValue>>);

/// Contract to the external per-producer UVE cache (§4.C). The concrete
/// production client is an external collaborator; only this trait
/// boundary is in scope.
#[async_trait]
pub trait UveCacheClient: Send + Sync + 'static {
    /// Fetches one UVE's current contents. `filters`, when present,
    /// restricts the read to the named struct-types; an absent struct-type
    /// in `filters` simply yields no entry, never an error. The returned
    /// `bool` is the failure flag: `true` means the read was partial and
    /// the caller must downgrade its overall success result, even though
    /// the (possibly partial) mapping is still usable.
    async fn get(
        &self,
        uve_key: &UveKey,
        filters: Option<&BTreeSet<String>>,
    ) -> (bool, BTreeMap<String, JsonValue>);

    /// Enumerates producer endpoints currently registered with discovery.
    async fn list_producers(&self) -> BTreeSet<ProducerEndpoint>;

    /// Fetches the subset of UVEs in `partition` belonging to `producer`,
    /// used by the ingestion worker's resource-check when a new producer
    /// is first seen.
    async fn partial_read(
        &self,
        partition: u32,
        producer: &ProducerEndpoint,
    ) -> PartialReadResult;
}
