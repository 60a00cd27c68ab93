//! In-memory publisher fake: records every published batch for test
//! assertions instead of handing off to a real broker.

use parking_lot::Mutex;

use alarmgen_core::PublishError;
use async_trait::async_trait;

use super::{AlarmgenPublisher, PublishMessage};

#[derive(Default)]
pub struct InMemoryPublisher {
    published: Mutex<Vec<(u32, Vec<PublishMessage>, Vec<PublishMessage>)>>,
    fail_next: Mutex<bool>,
}

impl InMemoryPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_publish(&self) {
        *self.fail_next.lock() = true;
    }

    #[must_use]
    pub fn published(&self) -> Vec<(u32, Vec<PublishMessage>, Vec<PublishMessage>)> {
        self.published.lock().clone()
    }
}

#[async_trait]
impl AlarmgenPublisher for InMemoryPublisher {
    async fn publish(
        &self,
        partition: u32,
        agguve_messages: Vec<PublishMessage>,
        alarm_messages: Vec<PublishMessage>,
    ) -> Result<(), PublishError> {
        if std::mem::take(&mut *self.fail_next.lock()) {
            return Err(PublishError::ProducerUnavailable);
        }
        self.published.lock().push((partition, agguve_messages, alarm_messages));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alarmgen_core::UveKey;

    #[tokio::test]
    async fn publish_records_the_batch() {
        let publisher = InMemoryPublisher::new();
        let key = UveKey::new("ObjectVRouter", "vr1");
        let msg = PublishMessage::uve_update(key, "host-1:0".into(), 100, Some("CpuInfo".into()), Some(serde_json::json!({"load": 1})));

        publisher.publish(0, vec![msg], vec![]).await.unwrap();
        assert_eq!(publisher.published().len(), 1);
    }

    #[tokio::test]
    async fn fail_next_returns_error_once() {
        let publisher = InMemoryPublisher::new();
        publisher.fail_next_publish();
        assert!(publisher.publish(0, vec![], vec![]).await.is_err());
        assert!(publisher.publish(0, vec![], vec![]).await.is_ok());
    }
}
