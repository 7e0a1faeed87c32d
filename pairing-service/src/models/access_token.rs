//! Access token model - server-side record behind every issued JWT.

use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::random_hex;

/// Display name recorded on tokens minted for the public client.
pub const ACCESS_TOKEN_NAME: &str = "Public Client Token";

/// Access token row. Only ever mutated to set `revoked`; rows are kept for
/// auditing.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AccessToken {
    /// 256-bit random id, hex encoded. Doubles as the JWT `jti`.
    pub token_id: String,
    pub user_id: Uuid,
    pub client_id: Uuid,
    pub token_name: String,
    pub scopes: Vec<String>,
    pub revoked: bool,
    pub expiry_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(user_id: Uuid, client_id: Uuid, scopes: Vec<String>, expires_in_days: i64) -> Self {
        let now = Utc::now();
        Self {
            token_id: random_hex(32),
            user_id,
            client_id,
            token_name: ACCESS_TOKEN_NAME.to_string(),
            scopes,
            revoked: false,
            expiry_utc: now + Duration::days(expires_in_days),
            created_utc: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expiry_utc
    }

    pub fn is_valid(&self) -> bool {
        !self.revoked && !self.is_expired()
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}
