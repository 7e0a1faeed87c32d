//! Storage seams for the pairing and token services.
//!
//! `Database` implements every trait against PostgreSQL; `MemoryDatabase`
//! implements them in process for tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::ServiceError;
use crate::models::{AccessToken, OAuthClient, PairingCode, RefreshToken, User};

/// Liveness probe for the system of record.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn health_check(&self) -> Result<(), ServiceError>;
}

/// Read-only view of the externally managed user table.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Case-insensitive lookup.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, ServiceError>;
}

/// System of record for pairing codes.
#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Whether `code` is held by a row that is still valid at `now`.
    async fn code_in_use(&self, code: &str, now: DateTime<Utc>) -> Result<bool, ServiceError>;

    /// Inserts the code, replacing whatever row the same user already had.
    async fn upsert_code(&self, code: &PairingCode) -> Result<(), ServiceError>;

    /// The row holding `code`, if its expiry lies after `now`.
    async fn find_valid_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PairingCode>, ServiceError>;

    /// Sets `activated`. Returns false when no row matched.
    async fn mark_activated(
        &self,
        code: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, ServiceError>;

    /// Deletes the activated row for `(code, user_id)` and stores the token
    /// pair in the same transaction. Exactly one caller observes `true` for a
    /// given row; on `false` or an error neither write is kept.
    async fn consume_code(
        &self,
        code: &str,
        user_id: Uuid,
        access_token: &AccessToken,
        refresh_token: &RefreshToken,
    ) -> Result<bool, ServiceError>;

    /// Deletes rows whose expiry is at or before `now`; returns the count.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, ServiceError>;
}

/// Persistence for the OAuth client record and issued tokens.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn find_client_by_name(&self, name: &str) -> Result<Option<OAuthClient>, ServiceError>;

    /// Stores an access token and its refresh token together.
    async fn insert_token_pair(
        &self,
        access_token: &AccessToken,
        refresh_token: &RefreshToken,
    ) -> Result<(), ServiceError>;

    async fn find_access_token(&self, token_id: &str)
        -> Result<Option<AccessToken>, ServiceError>;

    async fn find_refresh_token(
        &self,
        token_id: &str,
    ) -> Result<Option<RefreshToken>, ServiceError>;

    /// Atomically flips the refresh token from live to revoked, then revokes
    /// its access token and every refresh token pointing at that access
    /// token. Returns false, changing nothing, if the refresh token was
    /// already revoked.
    async fn revoke_session(
        &self,
        refresh_token_id: &str,
        access_token_id: &str,
    ) -> Result<bool, ServiceError>;
}
