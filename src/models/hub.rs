use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted hub record. Provisioning (claiming, secret rotation) happens
/// in the management API; this service only reads the record and flips the
/// online flag from the session actor's connect/disconnect transitions.
#[derive(Debug, Clone, FromRow)]
pub struct Hub {
    pub id: String,
    pub tenant_id: Uuid,
    pub secret_hash: String,
    pub is_online: bool,
    pub claimed_at: Option<DateTime<Utc>>,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl Hub {
    pub fn is_claimed(&self) -> bool {
        self.claimed_at.is_some()
    }
}
