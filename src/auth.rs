use crate::error::AppError;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardClaims {
    pub sub: String,
    pub tenant_id: Uuid,
    pub exp: usize,
}

/// Validates dashboard WebSocket auth tokens (HS256).
pub struct DashboardAuth {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl DashboardAuth {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// The token must be valid and issued for the tenant the socket was
    /// opened against; a token for another tenant is rejected outright.
    pub fn validate(&self, token: &str, tenant_id: Uuid) -> Result<DashboardClaims, AppError> {
        let data = decode::<DashboardClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AppError::Unauthorized(format!("invalid token: {e}")))?;

        if data.claims.tenant_id != tenant_id {
            return Err(AppError::Unauthorized("token tenant mismatch".into()));
        }

        Ok(data.claims)
    }
}

/// SHA-256 hex digest of a hub device secret, as stored on the hub record.
pub fn hub_secret_hash(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

pub fn verify_hub_secret(presented: &str, stored_hash: &str) -> bool {
    hub_secret_hash(presented).eq_ignore_ascii_case(stored_hash)
}
