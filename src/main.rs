use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use fleet_events_service::auth::DashboardAuth;
use fleet_events_service::config::Config;
use fleet_events_service::error::AppError;
use fleet_events_service::queue::consumer::QueueConsumer;
use fleet_events_service::queue::handlers::{
    DeadLetterHandler, FileProcessingHandler, NotificationsHandler, PrintEventsHandler,
    ShopifySyncHandler,
};
use fleet_events_service::queue::publisher::EventPublisher;
use fleet_events_service::queue::{Dispatcher, QueueName};
use fleet_events_service::services::blob_storage::BlobStorage;
use fleet_events_service::services::print_files::PrintFileService;
use fleet_events_service::state::AppState;
use fleet_events_service::websocket::{HubRegistry, TenantRegistry};
use fleet_events_service::{db, logging, routes};
use std::sync::Arc;
use tokio::sync::watch;

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    logging::init_tracing();

    let config = Arc::new(Config::from_env()?);
    if config.allow_unverified_hubs {
        tracing::warn!("ALLOW_UNVERIFIED_HUBS is set, hub secret checks are disabled");
    }

    let pool = db::init_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| AppError::Database(format!("migration failed: {e}")))?;

    let storage = Arc::new(BlobStorage::new(&config.s3).await);
    let publisher = Arc::new(EventPublisher::new(&config.kafka)?);
    let tenants = TenantRegistry::new();
    let hubs = HubRegistry::new();
    let auth = Arc::new(DashboardAuth::new(&config.dashboard_jwt_secret));
    let http_client = reqwest::Client::new();

    let print_files = Arc::new(PrintFileService::new(pool.clone(), storage.clone()));

    let mut dispatcher = Dispatcher::new(
        config.kafka.topic_prefix.clone(),
        config.queue_max_attempts,
    );
    dispatcher.register(Box::new(PrintEventsHandler::new(pool.clone())));
    dispatcher.register(Box::new(FileProcessingHandler::new(print_files.clone())));
    dispatcher.register(Box::new(ShopifySyncHandler::new(
        http_client.clone(),
        config.shopify_sync_url.clone(),
    )));
    dispatcher.register(Box::new(NotificationsHandler::new(
        tenants.clone(),
        http_client,
        config.notification_webhook_url.clone(),
    )));
    dispatcher.register(Box::new(DeadLetterHandler::new(pool.clone())));
    let dispatcher = Arc::new(dispatcher);

    // One consumer task per queue, so a retry backoff on one topic never
    // stalls delivery on the others.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut consumer_tasks = Vec::new();
    for queue in QueueName::ALL {
        let consumer = QueueConsumer::new(&config, queue, dispatcher.clone(), publisher.clone())?;
        consumer_tasks.push(tokio::spawn(consumer.run(shutdown_rx.clone())));
    }

    let state = AppState {
        db: pool,
        config: config.clone(),
        auth,
        publisher,
        tenants,
        hubs,
        storage,
    };

    tracing::info!(port = config.port, "starting fleet events service");
    let server = HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure)
    })
    .bind(("0.0.0.0", config.port))
    .map_err(|e| AppError::StartServer(e.to_string()))?
    .run();

    let result = server.await;

    // HTTP server has drained; stop the consumers before exiting.
    let _ = shutdown_tx.send(true);
    for task in consumer_tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "queue consumer task panicked");
        }
    }

    result.map_err(|e| AppError::StartServer(e.to_string()))
}
