use crate::queue::handlers::shopify_sync::post_json;
use crate::queue::{HandlerError, NotificationMessage, QueueHandler, QueueName};
use crate::websocket::broadcast::Publish;
use crate::websocket::TenantRegistry;
use async_trait::async_trait;

/// Delivers tenant notifications (inventory alerts, new orders) to live
/// dashboards and, when configured, to an external webhook.
pub struct NotificationsHandler {
    tenants: TenantRegistry,
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl NotificationsHandler {
    pub fn new(
        tenants: TenantRegistry,
        client: reqwest::Client,
        webhook_url: Option<String>,
    ) -> Self {
        Self {
            tenants,
            client,
            webhook_url,
        }
    }
}

#[async_trait]
impl QueueHandler for NotificationsHandler {
    fn queue(&self) -> QueueName {
        QueueName::Notifications
    }

    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let msg: NotificationMessage = serde_json::from_slice(payload)
            .map_err(|e| HandlerError::Permanent(format!("undecodable notification: {e}")))?;

        // Dashboard push is best-effort: no connected dashboards means
        // nobody to notify, not a failure.
        if let Some(addr) = self.tenants.get(msg.tenant_id) {
            addr.do_send(Publish(msg.event.clone()));
        }

        if let Some(url) = self.webhook_url.as_deref() {
            post_json(&self.client, url, &msg).await?;
        }
        Ok(())
    }
}
