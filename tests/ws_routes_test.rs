use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use async_trait::async_trait;
use fleet_events_service::auth::DashboardAuth;
use fleet_events_service::config::{Config, KafkaConfig, S3Config};
use fleet_events_service::error::AppError;
use fleet_events_service::queue::publisher::EventPublisher;
use fleet_events_service::routes;
use fleet_events_service::services::blob_storage::ObjectStore;
use fleet_events_service::state::AppState;
use fleet_events_service::websocket::{HubRegistry, TenantRegistry};
use std::sync::Arc;
use uuid::Uuid;

struct NullStore;

#[async_trait]
impl ObjectStore for NullStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, AppError> {
        Err(AppError::Storage(format!("no such object: {key}")))
    }

    async fn put(&self, _key: &str, _bytes: Vec<u8>, _ct: &str) -> Result<(), AppError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), AppError> {
        Ok(())
    }
}

fn test_state() -> AppState {
    let config = Config {
        database_url: "postgres://unused".into(),
        port: 0,
        kafka: KafkaConfig {
            brokers: "localhost:9092".into(),
            group_id: "test".into(),
            topic_prefix: String::new(),
        },
        s3: S3Config {
            bucket: "test".into(),
            region: "us-east-1".into(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
        },
        dashboard_jwt_secret: "test-secret".into(),
        auth_timeout_secs: 5,
        hub_offline_debounce_secs: 15,
        queue_max_attempts: 5,
        retry_backoff_base_ms: 500,
        allow_unverified_hubs: false,
        shopify_sync_url: None,
        notification_webhook_url: None,
    };

    AppState {
        db: sqlx::PgPool::connect_lazy(&config.database_url).unwrap(),
        auth: Arc::new(DashboardAuth::new(&config.dashboard_jwt_secret)),
        publisher: Arc::new(EventPublisher::new(&config.kafka).unwrap()),
        tenants: TenantRegistry::new(),
        hubs: HubRegistry::new(),
        storage: Arc::new(NullStore),
        config: Arc::new(config),
    }
}

// A plain HTTP GET against a WebSocket route is a client mistake, not a
// server failure: the handshake rejection must surface as-is.
#[actix_rt::test]
async fn plain_get_on_dashboard_socket_is_bad_request_not_server_error() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(test_state()))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/ws/dashboard?tenant={}", Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn dashboard_status_without_live_actor_returns_zeroed_stats() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(test_state()))
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/ws/dashboard/status?tenant={}", Uuid::new_v4()))
        .to_request();
    let stats: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(stats["connected"], 0);
    assert_eq!(stats["authenticated"], 0);
}
