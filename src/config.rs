use crate::error::AppError;
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub group_id: String,
    /// Optional prefix applied to every queue topic (e.g. "fleet" gives
    /// "fleet.print-events"). Empty means the bare queue names are used.
    pub topic_prefix: String,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub kafka: KafkaConfig,
    pub s3: S3Config,
    pub dashboard_jwt_secret: String,
    /// Hard deadline for the dashboard auth handshake.
    pub auth_timeout_secs: u64,
    /// How long a hub must stay disconnected before it is marked offline.
    pub hub_offline_debounce_secs: u64,
    /// Total delivery attempts before a queue message is dead-lettered.
    pub queue_max_attempts: u32,
    pub retry_backoff_base_ms: u64,
    /// Development-only escape hatch: skip hub secret verification.
    pub allow_unverified_hubs: bool,
    pub shopify_sync_url: Option<String>,
    pub notification_webhook_url: Option<String>,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL missing".into()))?;
        let dashboard_jwt_secret = env::var("DASHBOARD_JWT_SECRET")
            .map_err(|_| AppError::Config("DASHBOARD_JWT_SECRET missing".into()))?;

        let kafka = KafkaConfig {
            brokers: env::var("KAFKA_BROKERS").unwrap_or_else(|_| "localhost:9092".into()),
            group_id: env::var("KAFKA_GROUP_ID")
                .unwrap_or_else(|_| "fleet-events-service".into()),
            topic_prefix: env::var("KAFKA_TOPIC_PREFIX").unwrap_or_default(),
        };

        let s3 = S3Config {
            bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "fleet-print-files".into()),
            region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            endpoint: env::var("S3_ENDPOINT").ok(),
            access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
        };

        let allow_unverified_hubs = env::var("ALLOW_UNVERIFIED_HUBS")
            .ok()
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Ok(Self {
            database_url,
            port: env_parse("PORT", 3000),
            kafka,
            s3,
            dashboard_jwt_secret,
            auth_timeout_secs: env_parse("AUTH_TIMEOUT_SECS", 5),
            hub_offline_debounce_secs: env_parse("HUB_OFFLINE_DEBOUNCE_SECS", 15),
            queue_max_attempts: env_parse("QUEUE_MAX_ATTEMPTS", 5),
            retry_backoff_base_ms: env_parse("RETRY_BACKOFF_BASE_MS", 500),
            allow_unverified_hubs,
            shopify_sync_url: env::var("SHOPIFY_SYNC_URL").ok(),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL").ok(),
        })
    }
}
