use crate::db::dead_letter_repo;
use crate::queue::{DeadLetterMessage, HandlerError, QueueHandler, QueueName};
use async_trait::async_trait;
use sqlx::PgPool;

/// Terminal consumer: persists dead letters for operator inspection.
///
/// Never returns an error. A message that cannot be decoded or stored is
/// logged and acked anyway, otherwise a poison dead letter would cycle
/// through the pipeline forever.
pub struct DeadLetterHandler {
    db: PgPool,
}

impl DeadLetterHandler {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl QueueHandler for DeadLetterHandler {
    fn queue(&self) -> QueueName {
        QueueName::DeadLetter
    }

    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let msg = match serde_json::from_slice::<DeadLetterMessage>(payload) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::error!(error = %e, "undecodable dead letter, wrapping raw payload");
                DeadLetterMessage {
                    original_queue: "unknown".into(),
                    payload: serde_json::Value::String(
                        String::from_utf8_lossy(payload).into_owned(),
                    ),
                    reason: format!("undecodable dead letter: {e}"),
                    attempts: 0,
                }
            }
        };

        if let Err(e) = dead_letter_repo::insert(&self.db, &msg).await {
            tracing::error!(
                original_queue = %msg.original_queue,
                error = %e,
                "failed to persist dead letter"
            );
        } else {
            tracing::warn!(
                original_queue = %msg.original_queue,
                reason = %msg.reason,
                attempts = msg.attempts,
                "dead letter recorded"
            );
        }
        Ok(())
    }
}
