use crate::config::Config;
use crate::error::AppError;
use crate::queue::publisher::{EventPublisher, ATTEMPTS_HEADER};
use crate::queue::{DeadLetterMessage, Delivery, Dispatcher, Disposition, QueueName};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Headers, Message};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Consumer for a single queue topic.
///
/// One consumer task (and consumer group) per queue: a retry backoff
/// sleep only ever delays redeliveries of its own topic, never the other
/// queues. Offsets are committed manually, per message, only after the
/// message is settled (handled, re-enqueued for retry, or dead-lettered),
/// so a crash mid-flight redelivers instead of dropping.
pub struct QueueConsumer {
    consumer: StreamConsumer,
    queue: QueueName,
    dispatcher: Arc<Dispatcher>,
    publisher: Arc<EventPublisher>,
    topic_prefix: String,
    retry_backoff_base: Duration,
}

impl QueueConsumer {
    pub fn new(
        config: &Config,
        queue: QueueName,
        dispatcher: Arc<Dispatcher>,
        publisher: Arc<EventPublisher>,
    ) -> Result<Self, AppError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.kafka.brokers)
            .set("group.id", format!("{}.{}", config.kafka.group_id, queue))
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "30000")
            .create()
            .map_err(|e| AppError::Queue(format!("failed to create {queue} consumer: {e}")))?;

        let topic = queue.topic(&config.kafka.topic_prefix);
        consumer
            .subscribe(&[topic.as_str()])
            .map_err(|e| AppError::Queue(format!("failed to subscribe to {topic}: {e}")))?;

        Ok(Self {
            consumer,
            queue,
            dispatcher,
            publisher,
            topic_prefix: config.kafka.topic_prefix.clone(),
            retry_backoff_base: Duration::from_millis(config.retry_backoff_base_ms),
        })
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(queue = %self.queue, "queue consumer started");
        loop {
            tokio::select! {
                result = self.consumer.recv() => {
                    match result {
                        Ok(message) => self.process_message(&message).await,
                        Err(e) => {
                            tracing::error!(queue = %self.queue, error = %e, "kafka receive error");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!(queue = %self.queue, "queue consumer shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn process_message(&self, message: &BorrowedMessage<'_>) {
        let delivery = Delivery {
            payload: message.payload().unwrap_or_default().to_vec(),
            attempts: attempts_from_headers(message),
        };

        let disposition = self
            .dispatcher
            .dispatch_batch(message.topic(), std::slice::from_ref(&delivery))
            .await
            .pop()
            .unwrap_or(Disposition::Ack);

        match disposition {
            Disposition::Ack => self.commit(message),
            Disposition::Retry { attempts } => {
                self.retry(message, &delivery, attempts).await;
            }
            Disposition::DeadLetter { reason, attempts } => {
                self.dead_letter(message, &delivery, reason, attempts).await;
            }
        }
    }

    /// Re-enqueues the message with an incremented attempt count after a
    /// capped exponential backoff, then commits the original. A failed
    /// re-enqueue leaves the offset uncommitted so the broker redelivers.
    async fn retry(&self, message: &BorrowedMessage<'_>, delivery: &Delivery, attempts: u32) {
        tokio::time::sleep(self.backoff(attempts)).await;

        let topic = self.queue.topic(&self.topic_prefix);
        let key = message
            .key()
            .map(|k| String::from_utf8_lossy(k).into_owned())
            .unwrap_or_default();
        match self
            .publisher
            .publish_raw(&topic, &key, &delivery.payload, attempts)
            .await
        {
            Ok(()) => self.commit(message),
            Err(e) => {
                tracing::error!(queue = %self.queue, error = %e, "failed to re-enqueue for retry");
            }
        }
    }

    async fn dead_letter(
        &self,
        message: &BorrowedMessage<'_>,
        delivery: &Delivery,
        reason: String,
        attempts: u32,
    ) {
        // The dead-letter queue handles its own failures inline, never
        // through this path; a second hop would loop forever.
        if self.queue == QueueName::DeadLetter {
            tracing::error!(%reason, "dropping unprocessable dead-letter message");
            self.commit(message);
            return;
        }

        let payload = serde_json::from_slice(&delivery.payload).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&delivery.payload).into_owned())
        });
        let dead = DeadLetterMessage {
            original_queue: self.queue.as_str().to_string(),
            payload,
            reason,
            attempts,
        };
        match self.publisher.dead_letter(&dead).await {
            Ok(()) => self.commit(message),
            Err(e) => {
                tracing::error!(queue = %self.queue, error = %e, "failed to publish dead letter");
            }
        }
    }

    fn backoff(&self, attempts: u32) -> Duration {
        backoff_delay(self.retry_backoff_base, attempts)
    }

    fn commit(&self, message: &BorrowedMessage<'_>) {
        if let Err(e) = self.consumer.commit_message(message, CommitMode::Async) {
            tracing::error!(queue = %self.queue, error = %e, "failed to commit offset");
        }
    }
}

fn backoff_delay(base: Duration, attempts: u32) -> Duration {
    let exp = attempts.saturating_sub(1).min(16);
    (base * 2u32.pow(exp)).min(MAX_BACKOFF)
}

fn attempts_from_headers(message: &BorrowedMessage<'_>) -> u32 {
    let Some(headers) = message.headers() else {
        return 0;
    };
    for header in headers.iter() {
        if header.key == ATTEMPTS_HEADER {
            return header
                .value
                .and_then(|v| std::str::from_utf8(v).ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt_and_caps() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 2), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, 4), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, 30), MAX_BACKOFF);
    }
}
