use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;

use crate::utils::random_hex;

/// Refresh token row. The raw id is handed to the client as an opaque token
/// and is single-use: rotation revokes it together with its access token.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct RefreshToken {
    /// 320-bit random id, hex encoded.
    pub token_id: String,

    /// The access token this refresh token was minted with (reference only).
    pub access_token_id: String,

    /// Whether this token has been rotated or otherwise revoked
    pub revoked: bool,

    pub expiry_utc: DateTime<Utc>,

    pub created_utc: DateTime<Utc>,
}

impl RefreshToken {
    /// Create a refresh token paired with `access_token_id`
    pub fn new(access_token_id: String, expires_in_days: i64) -> Self {
        let now = Utc::now();
        Self {
            token_id: random_hex(40),
            access_token_id,
            revoked: false,
            expiry_utc: now + Duration::days(expires_in_days),
            created_utc: now,
        }
    }

    /// Check if this token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expiry_utc
    }

    /// Check if this token is valid (not expired and not revoked)
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.revoked
    }
}
