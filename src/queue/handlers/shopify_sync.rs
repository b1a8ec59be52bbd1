use crate::queue::{HandlerError, QueueHandler, QueueName, ShopifySyncMessage};
use async_trait::async_trait;

/// Forwards order-sync jobs to the configured Shopify sync endpoint.
pub struct ShopifySyncHandler {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl ShopifySyncHandler {
    pub fn new(client: reqwest::Client, endpoint: Option<String>) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl QueueHandler for ShopifySyncHandler {
    fn queue(&self) -> QueueName {
        QueueName::ShopifySync
    }

    async fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let msg: ShopifySyncMessage = serde_json::from_slice(payload)
            .map_err(|e| HandlerError::Permanent(format!("undecodable sync job: {e}")))?;

        let Some(endpoint) = self.endpoint.as_deref() else {
            tracing::warn!(
                order_id = %msg.order_id,
                "SHOPIFY_SYNC_URL not configured, dropping sync job"
            );
            return Ok(());
        };

        post_json(&self.client, endpoint, &msg).await?;
        tracing::debug!(order_id = %msg.order_id, tenant_id = %msg.tenant_id, "order synced");
        Ok(())
    }
}

/// POSTs a JSON body and maps the response onto the retry policy:
/// 4xx means the request itself is bad and a retry cannot help, while
/// 5xx and transport errors are worth another attempt.
pub(crate) async fn post_json<T: serde::Serialize>(
    client: &reqwest::Client,
    url: &str,
    body: &T,
) -> Result<(), HandlerError> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| HandlerError::Transient(format!("request to {url} failed: {e}")))?;

    let status = response.status();
    if status.is_success() {
        Ok(())
    } else if status.is_client_error() {
        Err(HandlerError::Permanent(format!("{url} returned {status}")))
    } else {
        Err(HandlerError::Transient(format!("{url} returned {status}")))
    }
}
