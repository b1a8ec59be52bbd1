use crate::db::printer_repo;
use crate::queue::{HandlerError, PrintEventMessage, QueueHandler, QueueName};
use crate::websocket::message_types::DashboardOutbound;
use async_trait::async_trait;
use sqlx::PgPool;

/// Persists normalized print events: printer statuses into the
/// current-status table, job updates into the append-only event log.
pub struct PrintEventsHandler {
    db: PgPool,
}

impl PrintEventsHandler {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl QueueHandler for PrintEventsHandler {
    fn queue(&self) -> QueueName {
        QueueName::PrintEvents
    }

    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let msg: PrintEventMessage = serde_json::from_slice(payload)
            .map_err(|e| HandlerError::Permanent(format!("undecodable print event: {e}")))?;

        match &msg.event {
            DashboardOutbound::PrinterStatus { printer_id, .. } => {
                let frame = serde_json::to_value(&msg.event)
                    .map_err(|e| HandlerError::Permanent(e.to_string()))?;
                printer_repo::upsert_status(&self.db, msg.tenant_id, printer_id, &frame)
                    .await
                    .map_err(|e| HandlerError::Transient(e.to_string()))?;
            }
            DashboardOutbound::JobUpdate { job_id, .. } => {
                let payload = serde_json::to_value(&msg.event)
                    .map_err(|e| HandlerError::Permanent(e.to_string()))?;
                printer_repo::append_job_event(&self.db, msg.tenant_id, job_id, &payload)
                    .await
                    .map_err(|e| HandlerError::Transient(e.to_string()))?;
            }
            other => {
                // Hubs only ever normalize to the two variants above.
                tracing::warn!(
                    hub_id = %msg.hub_id,
                    event_type = other.event_type(),
                    "unexpected event on print-events queue, skipping"
                );
            }
        }
        Ok(())
    }
}
