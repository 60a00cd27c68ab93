//! Publisher (§4.G): topic-per-partition emission of aggregated-UVE and
//! alarm deltas, generalized from the donor's `MutationObserver`/
//! `CompositeMutationObserver` fan-out pattern (notify interested parties
//! of a committed change) to a publisher-per-partition-output shape.

#[cfg(feature = "kafka")]
pub mod kafka_publisher;
pub mod memory;

use alarmgen_core::{PublishError, UveKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub use memory::InMemoryPublisher;

/// One emitted record, shape fixed by §4.G:
/// `{message, key, gen, coll, type, value?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishMessage {
    pub message: &'static str,
    pub key: UveKey,
    /// `host:instance` generation marker.
    pub gen: String,
    /// Partition-acquisition timestamp (monotonic UTC microseconds).
    pub coll: i64,
    #[serde(rename = "type")]
    pub struct_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<JsonValue>,
}

impl PublishMessage {
    #[must_use]
    pub fn uve_update(key: UveKey, gen: String, coll: i64, struct_type: Option<String>, value: Option<JsonValue>) -> Self {
        Self {
            message: "UVEUpdate",
            key,
            gen,
            coll,
            struct_type,
            value,
        }
    }
}

/// Emits a partition's batch of aggregated-UVE and alarm messages to
/// `agguve-{p}` and `alarm-{p}` with at-least-once delivery semantics
/// (small batch, short linger, bounded per-send timeout). On any publish
/// failure the caller (the state-compression loop) must requeue the
/// entire pending set for that partition; this trait never partially
/// acknowledges a batch.
#[async_trait]
pub trait AlarmgenPublisher: Send + Sync + 'static {
    /// # Errors
    ///
    /// Returns [`PublishError`] if delivery could not be confirmed for the
    /// batch; the producer for `partition` should be considered torn down
    /// by the caller on any error, to be rebuilt on the next iteration.
    async fn publish(
        &self,
        partition: u32,
        agguve_messages: Vec<PublishMessage>,
        alarm_messages: Vec<PublishMessage>,
    ) -> Result<(), PublishError>;
}
