//! Production `AlarmgenPublisher` backed by a real Kafka cluster. Gated
//! behind the `kafka` feature; delivery contract per §4.G: small batch,
//! short linger, bounded per-send timeout, cluster-commit acknowledgement.

use std::time::Duration;

use alarmgen_core::PublishError;
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};

use super::{AlarmgenPublisher, PublishMessage};

pub struct KafkaPublisher {
    producer: FutureProducer,
    send_timeout: Duration,
}

impl KafkaPublisher {
    /// # Errors
    ///
    /// Returns [`PublishError::ProducerUnavailable`] if the producer
    /// cannot be constructed from `brokers`.
    pub fn new(brokers: &[String], linger: Duration, send_timeout: Duration) -> Result<Self, PublishError> {
        let producer = ClientConfig::new()
            .set("bootstrap.servers", brokers.join(","))
            .set("acks", "all")
            .set("linger.ms", linger.as_millis().to_string())
            .set("batch.size", "10")
            .create()
            .map_err(|_| PublishError::ProducerUnavailable)?;
        Ok(Self { producer, send_timeout })
    }

    async fn send_all(&self, topic: &str, messages: &[PublishMessage]) -> Result<(), PublishError> {
        for message in messages {
            let payload = serde_json::to_vec(message).map_err(|_| PublishError::Rejected)?;
            let key = message.key.to_string();
            let record = FutureRecord::to(topic).payload(&payload).key(&key);
            self.producer
                .send(record, self.send_timeout)
                .await
                .map_err(|_| PublishError::Timeout)?;
        }
        Ok(())
    }
}

#[async_trait]
impl AlarmgenPublisher for KafkaPublisher {
    async fn publish(
        &self,
        partition: u32,
        agguve_messages: Vec<PublishMessage>,
        alarm_messages: Vec<PublishMessage>,
    ) -> Result<(), PublishError> {
        self.send_all(&format!("agguve-{partition}"), &agguve_messages).await?;
        self.send_all(&format!("alarm-{partition}"), &alarm_messages).await?;
        Ok(())
    }
}
