//! TV pairing code lifecycle.
//!
//! A code moves `Generated -> Activated -> Consumed`, or to `Expired` once its
//! expiry passes. The durable store is the system of record; the cache holds
//! a replica keyed by code so polling TVs rarely reach the database.
//! Activation is serialised per code through the lock manager, consumption
//! through `CodeStore::consume_code`, which deletes the row and stores the
//! TV's token pair in one transaction.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::cache::PairingCodeCache;
use super::code_generator::CodeGenerator;
use super::lock::{with_lock, LockBudget, LockManager};
use super::metrics;
use super::repository::{CodeStore, UserDirectory};
use super::token_issuer::{TokenBundle, TokenIssuer};
use super::ServiceError;
use crate::config::TvCodeConfig;
use crate::models::{PairingCode, PairingCodeState};

/// Scope granted to tokens minted for a paired TV.
pub const TV_SCOPE: &str = "tv";

/// Key prefix of the per-code activation lock.
pub const CODE_LOCK_PREFIX: &str = "lock:tv_code:";

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub activated: bool,
    pub expires_at: DateTime<Utc>,
    /// Present exactly once, on the poll that consumes an activated code.
    pub token: Option<TokenBundle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivationOutcome {
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TvPairingService {
    users: Arc<dyn UserDirectory>,
    codes: Arc<dyn CodeStore>,
    cache: PairingCodeCache,
    locks: Arc<dyn LockManager>,
    issuer: TokenIssuer,
    generator: CodeGenerator,
    code_lifetime: Duration,
    lock_budget: LockBudget,
}

impl TvPairingService {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        codes: Arc<dyn CodeStore>,
        cache: PairingCodeCache,
        locks: Arc<dyn LockManager>,
        issuer: TokenIssuer,
        config: &TvCodeConfig,
    ) -> Self {
        Self {
            users,
            codes,
            cache,
            locks,
            issuer,
            generator: CodeGenerator::new(config.max_attempts),
            code_lifetime: Duration::minutes(config.expiry_minutes),
            lock_budget: config.lock_budget(),
        }
    }

    /// Issues a fresh code for the user registered under `email`, replacing
    /// any code that user already had.
    #[tracing::instrument(skip(self, email))]
    pub async fn generate(&self, email: &str) -> Result<GeneratedCode, ServiceError> {
        let user = self
            .users
            .find_user_by_email(email)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        let now = Utc::now();
        let code = self.generator.generate(self.codes.as_ref(), now).await?;
        let row = PairingCode::new(user.user_id, code, now + self.code_lifetime);

        self.codes.upsert_code(&row).await?;
        if let Err(e) = self.cache.put(&row.one_time_code, &row.to_state(), now).await {
            tracing::warn!(error = %e, "Failed to cache pairing code, polls will use durable store");
        }

        metrics::record_tv_code_event("generated");
        tracing::info!(user_id = %user.user_id, expires_at = %row.expiry_utc, "Generated TV pairing code");

        if let Err(e) = self.purge_expired().await {
            tracing::warn!(error = %e, "Failed to purge expired pairing codes");
        }

        Ok(GeneratedCode {
            code: row.one_time_code,
            expires_at: row.expiry_utc,
        })
    }

    /// Reports the state of `code`. Once activated, the first poll consumes
    /// the code and carries a `tv` scoped token; later polls see `NotFound`.
    #[tracing::instrument(skip(self, code))]
    pub async fn poll(&self, code: &str) -> Result<PollOutcome, ServiceError> {
        let now = Utc::now();
        let state = self.lookup(code, now).await?;

        if !state.activated {
            return Ok(PollOutcome {
                activated: false,
                expires_at: state.expiry_utc(),
                token: None,
            });
        }

        // Anything that fails before `consume_code` leaves the code pollable
        let user = self
            .users
            .find_user_by_id(state.user_id)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;
        let issued = self.issuer.prepare(&user, &[TV_SCOPE.to_string()]).await?;

        let consumed = self
            .codes
            .consume_code(code, state.user_id, &issued.access_token, &issued.refresh_token)
            .await?;
        self.evict(code).await;
        if !consumed {
            return Err(ServiceError::NotFound("Code"));
        }

        metrics::record_tv_code_event("consumed");
        let token = issued.into_bundle();
        tracing::info!(user_id = %user.user_id, "TV paired");

        Ok(PollOutcome {
            activated: true,
            expires_at: state.expiry_utc(),
            token: Some(token),
        })
    }

    /// Marks `code` activated on behalf of `user_id`, who must own it.
    /// Activating an already activated code again succeeds.
    #[tracing::instrument(skip(self, code))]
    pub async fn activate(
        &self,
        code: &str,
        user_id: Uuid,
    ) -> Result<ActivationOutcome, ServiceError> {
        let state = self.lookup(code, Utc::now()).await?;
        if state.user_id != user_id {
            tracing::warn!(%user_id, "Activation attempted by non-owner");
            return Err(ServiceError::InvalidOwner);
        }

        let lock_key = format!("{}{}", CODE_LOCK_PREFIX, code);
        let activated = with_lock(self.locks.as_ref(), &lock_key, self.lock_budget, || async move {
            let now = Utc::now();
            let row = self
                .codes
                .find_valid_code(code, now)
                .await?
                .ok_or(ServiceError::NotFound("Code"))?;
            if row.user_id != user_id {
                return Err(ServiceError::InvalidOwner);
            }

            if !row.activated && !self.codes.mark_activated(code, user_id, now).await? {
                return Err(ServiceError::NotFound("Code"));
            }

            let state = row.to_state().activated();
            if let Err(e) = self.cache.put(code, &state, now).await {
                tracing::warn!(error = %e, "Failed to cache activation, dropping stale entry");
                self.evict(code).await;
            }
            Ok(state)
        })
        .await?;

        metrics::record_tv_code_event("activated");
        tracing::info!(%user_id, "Activated TV pairing code");

        Ok(ActivationOutcome {
            expires_at: activated.expiry_utc(),
        })
    }

    /// Deletes expired codes from the durable store. Runs after every
    /// `generate`.
    pub async fn purge_expired(&self) -> Result<u64, ServiceError> {
        let purged = self.codes.purge_expired(Utc::now()).await?;
        if purged > 0 {
            metrics::record_tv_code_events("purged", purged);
            tracing::info!(purged, "Purged expired TV pairing codes");
        }
        Ok(purged)
    }

    /// Cache first, then the durable store. A durable hit is written back to
    /// the cache.
    async fn lookup(&self, code: &str, now: DateTime<Utc>) -> Result<PairingCodeState, ServiceError> {
        match self.cache.get(code).await {
            Ok(Some(state)) if state.is_valid_at(now) => return Ok(state),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Pairing code cache unavailable, using durable store"),
        }

        let row = self
            .codes
            .find_valid_code(code, now)
            .await?
            .ok_or(ServiceError::NotFound("Code"))?;

        let state = row.to_state();
        if let Err(e) = self.cache.put(code, &state, now).await {
            tracing::warn!(error = %e, "Failed to repopulate pairing code cache");
        }
        Ok(state)
    }

    async fn evict(&self, code: &str) {
        if let Err(e) = self.cache.evict(code).await {
            tracing::warn!(error = %e, "Failed to evict pairing code from cache");
        }
    }
}
