use crate::auth::DashboardAuth;
use crate::config::Config;
use crate::queue::publisher::EventPublisher;
use crate::services::blob_storage::ObjectStore;
use crate::websocket::{HubRegistry, TenantRegistry};
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub auth: Arc<DashboardAuth>,
    pub publisher: Arc<EventPublisher>,
    pub tenants: TenantRegistry,
    pub hubs: HubRegistry,
    pub storage: Arc<dyn ObjectStore>,
}
