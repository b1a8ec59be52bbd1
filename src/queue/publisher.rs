use crate::config::KafkaConfig;
use crate::error::AppError;
use crate::queue::{DeadLetterMessage, PrintEventMessage, QueueName};
use rdkafka::config::ClientConfig;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::Serialize;
use std::time::Duration;

pub const ATTEMPTS_HEADER: &str = "x-delivery-attempts";

/// Kafka producer shared by the HTTP layer, hub sessions, and the
/// consumer's retry/dead-letter paths.
pub struct EventPublisher {
    producer: FutureProducer,
    topic_prefix: String,
}

impl EventPublisher {
    pub fn new(config: &KafkaConfig) -> Result<Self, AppError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", "30000")
            .set("enable.idempotence", "true")
            .create()
            .map_err(|e| AppError::Queue(format!("failed to create producer: {e}")))?;

        Ok(Self {
            producer,
            topic_prefix: config.topic_prefix.clone(),
        })
    }

    /// Publishes a JSON payload to `queue`, awaiting the broker ack.
    /// `attempts` rides along in a header so the consumer can count
    /// redeliveries across re-enqueues.
    pub async fn publish<T: Serialize>(
        &self,
        queue: QueueName,
        key: &str,
        payload: &T,
        attempts: u32,
    ) -> Result<(), AppError> {
        let topic = queue.topic(&self.topic_prefix);
        let bytes = serde_json::to_vec(payload)?;
        self.publish_raw(&topic, key, &bytes, attempts).await
    }

    pub async fn publish_raw(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
        attempts: u32,
    ) -> Result<(), AppError> {
        let attempts_str = attempts.to_string();
        let record = FutureRecord::to(topic)
            .key(key)
            .payload(payload)
            .headers(OwnedHeaders::new().insert(Header {
                key: ATTEMPTS_HEADER,
                value: Some(&attempts_str),
            }));

        self.producer
            .send(record, Duration::from_secs(10))
            .await
            .map_err(|(e, _)| AppError::Queue(format!("produce to {topic} failed: {e}")))?;
        Ok(())
    }

    /// Enqueues a print event without awaiting the broker ack.
    ///
    /// `send_result` hands the record to the producer's internal queue
    /// synchronously, so calling this from the hub session's stream
    /// handler preserves per-hub arrival order; the delivery ack is
    /// awaited in a background task.
    pub fn enqueue_print_event(&self, msg: &PrintEventMessage) -> Result<(), AppError> {
        let topic = QueueName::PrintEvents.topic(&self.topic_prefix);
        let bytes = serde_json::to_vec(msg)?;
        let record = FutureRecord::to(&topic)
            .key(&msg.hub_id)
            .payload(&bytes)
            .headers(OwnedHeaders::new().insert(Header {
                key: ATTEMPTS_HEADER,
                value: Some("0"),
            }));

        let delivery = self
            .producer
            .send_result(record)
            .map_err(|(e, _)| AppError::Queue(format!("producer queue full: {e}")))?;

        let hub_id = msg.hub_id.clone();
        tokio::spawn(async move {
            match delivery.await {
                Ok(Ok(_)) => {}
                Ok(Err((e, _))) => {
                    tracing::error!(%hub_id, error = %e, "print event delivery failed");
                }
                Err(_) => {
                    tracing::error!(%hub_id, "print event delivery future canceled");
                }
            }
        });
        Ok(())
    }

    pub async fn dead_letter(&self, msg: &DeadLetterMessage) -> Result<(), AppError> {
        self.publish(QueueName::DeadLetter, &msg.original_queue, msg, msg.attempts)
            .await
    }
}
