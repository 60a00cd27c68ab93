//! Production `UveCacheClient` backed by a real Redis deployment.
//! Gated behind the `cache-redis` feature; the wire format for producer
//! discovery and per-producer partial reads is owned by the deployment's
//! discovery registry, which this crate treats as an external collaborator
//! (§1) and does not reimplement here.

use std::collections::{BTreeMap, BTreeSet};

use alarmgen_core::{CacheError, UveKey};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value as JsonValue;

use super::{PartialReadResult, ProducerEndpoint, UveCacheClient};

/// Reads UVE contents as a Redis hash keyed by `table:name`, with
/// struct-type as the hash field and a JSON-encoded value.
pub struct RedisUveCacheClient {
    connection: ConnectionManager,
}

impl RedisUveCacheClient {
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] if the initial connection fails.
    pub async fn connect(endpoints: &[String], password: &str) -> Result<Self, CacheError> {
        let Some(endpoint) = endpoints.first() else {
            return Err(CacheError::Unavailable);
        };
        let url = if password.is_empty() {
            format!("redis://{endpoint}")
        } else {
            format!("redis://:{password}@{endpoint}")
        };
        let client = redis::Client::open(url).map_err(|_| CacheError::Unavailable)?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|_| CacheError::Unavailable)?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl UveCacheClient for RedisUveCacheClient {
    async fn get(
        &self,
        uve_key: &UveKey,
        filters: Option<&BTreeSet<String>>,
    ) -> (bool, BTreeMap<String, JsonValue>) {
        let mut connection = self.connection.clone();
        let raw: Result<Vec<(String, String)>, _> =
            connection.hgetall(uve_key.to_string()).await;

        let Ok(raw) = raw else {
            return (true, BTreeMap::new());
        };

        let mut mapping = BTreeMap::new();
        let mut partial = false;
        for (struct_type, payload) in raw {
            if let Some(wanted) = filters {
                if !wanted.contains(&struct_type) {
                    continue;
                }
            }
            match serde_json::from_str::<JsonValue>(&payload) {
                Ok(value) => {
                    mapping.insert(struct_type, value);
                }
                Err(_) => partial = true,
            }
        }
        (partial, mapping)
    }

    async fn list_producers(&self) -> BTreeSet<ProducerEndpoint> {
        // Producer discovery is served by the deployment's service-discovery
        // registry, not Redis itself; out of scope per §1.
        BTreeSet::new()
    }

    async fn partial_read(&self, _partition: u32, producer: &ProducerEndpoint) -> PartialReadResult {
        (format!("{}:{}", producer.ip, producer.port), BTreeMap::new())
    }
}
