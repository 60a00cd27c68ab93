//! Production `IngestionSource` backed by a real Kafka cluster. Gated
//! behind the `kafka` feature. One instance subscribes to exactly one
//! partition's shard topic (`uve-{p}`), matching the per-partition worker
//! it feeds; the spawner constructs one per acquired partition.

use alarmgen_core::{IngestionError, NotifHint, UveKey};
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::Message;

use super::IngestionSource;
use crate::ingestion::IngestionBatch;

pub struct KafkaIngestionSource {
    consumer: StreamConsumer,
}

impl KafkaIngestionSource {
    /// # Errors
    ///
    /// Returns [`IngestionError::StreamClosed`] if the consumer cannot be
    /// constructed or subscribed to `uve-{partition}` from `brokers`.
    pub fn new(brokers: &[String], group_id: &str, partition: u32) -> Result<Self, IngestionError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers.join(","))
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .create()
            .map_err(|_| IngestionError::StreamClosed)?;

        consumer
            .subscribe(&[&format!("uve-{partition}")])
            .map_err(|_| IngestionError::StreamClosed)?;

        Ok(Self { consumer })
    }
}

#[async_trait]
impl IngestionSource for KafkaIngestionSource {
    async fn read_batch(&self, _partition: u32) -> Result<IngestionBatch, IngestionError> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|_| IngestionError::StreamClosed)?;

        let Some(payload) = message.payload() else {
            return Ok(IngestionBatch { entries: Vec::new() });
        };
        let entries: Vec<(UveKey, NotifHint)> = serde_json::from_slice(payload)?;
        Ok(IngestionBatch { entries })
    }
}
