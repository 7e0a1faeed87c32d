use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::repository::{CodeStore, StoreHealth, TokenRepository, UserDirectory};
use super::ServiceError;
use crate::models::{AccessToken, OAuthClient, PairingCode, RefreshToken, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    clients: Vec<OAuthClient>,
    /// Keyed by owner, mirroring the unique index on `user_id`.
    codes: HashMap<Uuid, PairingCode>,
    access_tokens: HashMap<String, AccessToken>,
    refresh_tokens: HashMap<String, RefreshToken>,
}

/// In-process stand-in for `Database`. Every operation runs under a single
/// mutex, which gives the same atomicity the SQL transactions provide.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: Mutex<Tables>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, ServiceError> {
        self.tables
            .lock()
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Memory database mutex poisoned: {}", e)))
    }

    pub fn add_user(&self, user: User) -> Result<(), ServiceError> {
        self.tables()?.users.insert(user.user_id, user);
        Ok(())
    }

    pub fn remove_user(&self, user_id: Uuid) -> Result<(), ServiceError> {
        self.tables()?.users.remove(&user_id);
        Ok(())
    }

    pub fn add_client(&self, client: OAuthClient) -> Result<(), ServiceError> {
        self.tables()?.clients.push(client);
        Ok(())
    }

    /// Current row for `user_id`, expired or not.
    pub fn code_for_user(&self, user_id: Uuid) -> Result<Option<PairingCode>, ServiceError> {
        Ok(self.tables()?.codes.get(&user_id).cloned())
    }

    pub fn code_count(&self) -> Result<usize, ServiceError> {
        Ok(self.tables()?.codes.len())
    }

    /// Overwrites a stored code row, e.g. to move its expiry into the past.
    pub fn put_code(&self, code: PairingCode) -> Result<(), ServiceError> {
        self.tables()?.codes.insert(code.user_id, code);
        Ok(())
    }

    /// Overwrites a stored refresh token row.
    pub fn put_refresh_token(&self, token: RefreshToken) -> Result<(), ServiceError> {
        self.tables()?
            .refresh_tokens
            .insert(token.token_id.clone(), token);
        Ok(())
    }

    pub fn revoke_access_token(&self, token_id: &str) -> Result<(), ServiceError> {
        if let Some(token) = self.tables()?.access_tokens.get_mut(token_id) {
            token.revoked = true;
        }
        Ok(())
    }
}

#[async_trait]
impl StoreHealth for MemoryDatabase {
    async fn health_check(&self) -> Result<(), ServiceError> {
        self.tables().map(|_| ())
    }
}

#[async_trait]
impl UserDirectory for MemoryDatabase {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let tables = self.tables()?;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, ServiceError> {
        Ok(self.tables()?.users.get(&user_id).cloned())
    }
}

#[async_trait]
impl CodeStore for MemoryDatabase {
    async fn code_in_use(&self, code: &str, now: DateTime<Utc>) -> Result<bool, ServiceError> {
        let tables = self.tables()?;
        Ok(tables
            .codes
            .values()
            .any(|c| c.one_time_code == code && c.is_valid_at(now)))
    }

    async fn upsert_code(&self, code: &PairingCode) -> Result<(), ServiceError> {
        let mut tables = self.tables()?;

        let now = code.created_utc;
        tables.codes.retain(|owner, existing| {
            *owner == code.user_id
                || existing.one_time_code != code.one_time_code
                || existing.is_valid_at(now)
        });

        let clash = tables
            .codes
            .values()
            .any(|c| c.user_id != code.user_id && c.one_time_code == code.one_time_code);
        if clash {
            return Err(ServiceError::Internal(anyhow::anyhow!(
                "Pairing code already held by another user"
            )));
        }

        tables.codes.insert(code.user_id, code.clone());
        Ok(())
    }

    async fn find_valid_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PairingCode>, ServiceError> {
        let tables = self.tables()?;
        Ok(tables
            .codes
            .values()
            .find(|c| c.one_time_code == code && c.is_valid_at(now))
            .cloned())
    }

    async fn mark_activated(
        &self,
        code: &str,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        let mut tables = self.tables()?;
        match tables.codes.get_mut(&user_id) {
            Some(row) if row.one_time_code == code => {
                row.activated = true;
                row.updated_utc = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn consume_code(
        &self,
        code: &str,
        user_id: Uuid,
        access_token: &AccessToken,
        refresh_token: &RefreshToken,
    ) -> Result<bool, ServiceError> {
        let mut tables = self.tables()?;
        let matches = tables
            .codes
            .get(&user_id)
            .is_some_and(|row| row.one_time_code == code && row.activated);
        if matches {
            tables.codes.remove(&user_id);
            tables
                .access_tokens
                .insert(access_token.token_id.clone(), access_token.clone());
            tables
                .refresh_tokens
                .insert(refresh_token.token_id.clone(), refresh_token.clone());
        }
        Ok(matches)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, ServiceError> {
        let mut tables = self.tables()?;
        let before = tables.codes.len();
        tables.codes.retain(|_, c| c.is_valid_at(now));
        Ok((before - tables.codes.len()) as u64)
    }
}

#[async_trait]
impl TokenRepository for MemoryDatabase {
    async fn find_client_by_name(&self, name: &str) -> Result<Option<OAuthClient>, ServiceError> {
        let tables = self.tables()?;
        Ok(tables
            .clients
            .iter()
            .find(|c| c.client_name == name)
            .cloned())
    }

    async fn insert_token_pair(
        &self,
        access_token: &AccessToken,
        refresh_token: &RefreshToken,
    ) -> Result<(), ServiceError> {
        let mut tables = self.tables()?;
        tables
            .access_tokens
            .insert(access_token.token_id.clone(), access_token.clone());
        tables
            .refresh_tokens
            .insert(refresh_token.token_id.clone(), refresh_token.clone());
        Ok(())
    }

    async fn find_access_token(
        &self,
        token_id: &str,
    ) -> Result<Option<AccessToken>, ServiceError> {
        Ok(self.tables()?.access_tokens.get(token_id).cloned())
    }

    async fn find_refresh_token(
        &self,
        token_id: &str,
    ) -> Result<Option<RefreshToken>, ServiceError> {
        Ok(self.tables()?.refresh_tokens.get(token_id).cloned())
    }

    async fn revoke_session(
        &self,
        refresh_token_id: &str,
        access_token_id: &str,
    ) -> Result<bool, ServiceError> {
        let mut tables = self.tables()?;

        match tables.refresh_tokens.get_mut(refresh_token_id) {
            Some(token) if !token.revoked => token.revoked = true,
            _ => return Ok(false),
        }

        if let Some(access) = tables.access_tokens.get_mut(access_token_id) {
            access.revoked = true;
        }
        for token in tables.refresh_tokens.values_mut() {
            if token.access_token_id == access_token_id {
                token.revoked = true;
            }
        }
        Ok(true)
    }
}
