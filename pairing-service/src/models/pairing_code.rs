//! Pairing code model - short numeric codes binding a TV to a user.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Pairing code row in the durable store.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PairingCode {
    pub code_id: Uuid,
    pub user_id: Uuid,
    pub one_time_code: String,
    pub activated: bool,
    pub expiry_utc: DateTime<Utc>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl PairingCode {
    /// Create a fresh, not yet activated code.
    pub fn new(user_id: Uuid, one_time_code: String, expiry_utc: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            code_id: Uuid::new_v4(),
            user_id,
            one_time_code,
            activated: false,
            expiry_utc,
            created_utc: now,
            updated_utc: now,
        }
    }

    /// A code is usable while its expiry lies strictly in the future.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_utc > now
    }

    /// The replica of this row kept in the cache.
    pub fn to_state(&self) -> PairingCodeState {
        PairingCodeState {
            user_id: self.user_id,
            activated: self.activated,
            expires_at: self.expiry_utc.timestamp(),
        }
    }
}

/// Pairing code state as replicated into the cache under `tv_code:<code>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingCodeState {
    pub user_id: Uuid,
    pub activated: bool,
    /// Unix timestamp (seconds).
    pub expires_at: i64,
}

impl PairingCodeState {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now.timestamp()
    }

    pub fn expiry_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.expires_at, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn activated(self) -> Self {
        Self {
            activated: true,
            ..self
        }
    }
}
