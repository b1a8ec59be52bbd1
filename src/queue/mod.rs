use crate::websocket::message_types::DashboardOutbound;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

pub mod consumer;
pub mod handlers;
pub mod publisher;

/// The logical queues this service consumes and produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueName {
    PrintEvents,
    FileProcessing,
    ShopifySync,
    Notifications,
    DeadLetter,
}

impl QueueName {
    pub const ALL: [QueueName; 5] = [
        QueueName::PrintEvents,
        QueueName::FileProcessing,
        QueueName::ShopifySync,
        QueueName::Notifications,
        QueueName::DeadLetter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::PrintEvents => "print-events",
            QueueName::FileProcessing => "file-processing",
            QueueName::ShopifySync => "shopify-sync",
            QueueName::Notifications => "notifications",
            QueueName::DeadLetter => "dead-letter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "print-events" => Some(QueueName::PrintEvents),
            "file-processing" => Some(QueueName::FileProcessing),
            "shopify-sync" => Some(QueueName::ShopifySync),
            "notifications" => Some(QueueName::Notifications),
            "dead-letter" => Some(QueueName::DeadLetter),
            _ => None,
        }
    }

    pub fn topic(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.as_str())
    }

    pub fn from_topic(topic: &str, prefix: &str) -> Option<Self> {
        topic.strip_prefix(prefix).and_then(Self::parse)
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized print event produced by a hub session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintEventMessage {
    pub hub_id: String,
    pub tenant_id: Uuid,
    pub event: DashboardOutbound,
    pub enqueued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileProcessingMessage {
    pub file_id: Uuid,
    pub tenant_id: Uuid,
    pub storage_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopifySyncMessage {
    pub tenant_id: Uuid,
    pub order_id: String,
    pub payload: Value,
}

/// A tenant-scoped event to fan out to connected dashboards and,
/// optionally, an external webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub tenant_id: Uuid,
    pub event: DashboardOutbound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterMessage {
    pub original_queue: String,
    pub payload: Value,
    pub reason: String,
    pub attempts: u32,
}

/// One message pulled off a queue, with its delivery attempt count.
/// `attempts` counts completed failed attempts, so a fresh message
/// carries 0.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub payload: Vec<u8>,
    pub attempts: u32,
}

impl Delivery {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            attempts: 0,
        }
    }
}

/// What the consumer should do with a message after dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    Retry { attempts: u32 },
    DeadLetter { reason: String, attempts: u32 },
}

/// Handler failures, split by whether a retry could possibly help.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("transient: {0}")]
    Transient(String),
    #[error("permanent: {0}")]
    Permanent(String),
}

#[async_trait]
pub trait QueueHandler: Send + Sync {
    fn queue(&self) -> QueueName;

    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerError>;
}

/// Routes deliveries to the handler registered for their queue and turns
/// the outcome into a settlement decision. Pure policy, no broker I/O.
pub struct Dispatcher {
    handlers: HashMap<QueueName, Box<dyn QueueHandler>>,
    topic_prefix: String,
    max_attempts: u32,
}

impl Dispatcher {
    pub fn new(topic_prefix: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            handlers: HashMap::new(),
            topic_prefix: topic_prefix.into(),
            max_attempts,
        }
    }

    pub fn register(&mut self, handler: Box<dyn QueueHandler>) {
        let queue = handler.queue();
        if self.handlers.insert(queue, handler).is_some() {
            tracing::warn!(%queue, "replaced existing queue handler");
        }
    }

    /// Settles a batch from one topic. An unrecognized topic acks every
    /// message so a stray subscription cannot wedge the consumer group.
    pub async fn dispatch_batch(&self, topic: &str, deliveries: &[Delivery]) -> Vec<Disposition> {
        let Some(queue) = QueueName::from_topic(topic, &self.topic_prefix) else {
            tracing::error!(%topic, "messages from unrecognized topic, acking batch");
            return vec![Disposition::Ack; deliveries.len()];
        };
        let mut out = Vec::with_capacity(deliveries.len());
        for delivery in deliveries {
            out.push(self.dispatch(queue, delivery).await);
        }
        out
    }

    pub async fn dispatch(&self, queue: QueueName, delivery: &Delivery) -> Disposition {
        let Some(handler) = self.handlers.get(&queue) else {
            // A topic nobody handles must not wedge the consumer group.
            tracing::error!(%queue, "no handler registered, acking message unprocessed");
            return Disposition::Ack;
        };

        match handler.handle(&delivery.payload).await {
            Ok(()) => Disposition::Ack,
            Err(HandlerError::Permanent(reason)) => {
                tracing::warn!(%queue, %reason, "permanent failure, dead-lettering");
                Disposition::DeadLetter {
                    reason,
                    attempts: delivery.attempts + 1,
                }
            }
            Err(HandlerError::Transient(reason)) => {
                let attempts = delivery.attempts + 1;
                if attempts >= self.max_attempts {
                    tracing::warn!(
                        %queue,
                        %reason,
                        attempts,
                        "retries exhausted, dead-lettering"
                    );
                    Disposition::DeadLetter { reason, attempts }
                } else {
                    tracing::info!(%queue, %reason, attempts, "transient failure, will retry");
                    Disposition::Retry { attempts }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_names_round_trip_through_topics() {
        for queue in QueueName::ALL {
            let topic = queue.topic("fleet.");
            assert_eq!(QueueName::from_topic(&topic, "fleet."), Some(queue));
        }
        assert_eq!(QueueName::from_topic("fleet.unknown", "fleet."), None);
        assert_eq!(QueueName::from_topic("print-events", "fleet."), None);
    }
}
