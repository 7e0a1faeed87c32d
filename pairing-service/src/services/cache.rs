use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::ServiceError;
use crate::models::PairingCodeState;

/// Key prefix for replicated pairing code state.
pub const CODE_CACHE_PREFIX: &str = "tv_code:";

/// String key/value cache with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), anyhow::Error>;
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error>;
    async fn delete(&self, key: &str) -> Result<(), anyhow::Error>;
    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

/// Typed view over a `CacheStore` holding pairing code state.
#[derive(Clone)]
pub struct PairingCodeCache {
    store: Arc<dyn CacheStore>,
}

impl PairingCodeCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    fn key(code: &str) -> String {
        format!("{}{}", CODE_CACHE_PREFIX, code)
    }

    /// Cached state for `code`. Entries that no longer parse are treated as
    /// misses so the durable store gets consulted instead.
    pub async fn get(&self, code: &str) -> Result<Option<PairingCodeState>, ServiceError> {
        let raw = self
            .store
            .get(&Self::key(code))
            .await
            .map_err(ServiceError::Cache)?;

        Ok(raw.and_then(|value| match serde_json::from_str(&value) {
            Ok(state) => Some(state),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding malformed pairing code cache entry");
                None
            }
        }))
    }

    /// Writes `state` with a TTL matching its remaining lifetime. States that
    /// are already expired are not written.
    pub async fn put(
        &self,
        code: &str,
        state: &PairingCodeState,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let ttl = state.expires_at - now.timestamp();
        if ttl <= 0 {
            return Ok(());
        }

        let value = serde_json::to_string(state)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to encode cache entry: {}", e)))?;
        self.store
            .set(&Self::key(code), &value, ttl as u64)
            .await
            .map_err(ServiceError::Cache)
    }

    pub async fn evict(&self, code: &str) -> Result<(), ServiceError> {
        self.store
            .delete(&Self::key(code))
            .await
            .map_err(ServiceError::Cache)
    }
}

/// In-process `CacheStore` honouring TTLs.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value stored under `key`, ignoring expiry.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).map(|(value, _)| value.clone()))
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), anyhow::Error> {
        let expires = Instant::now() + Duration::from_secs(ttl_seconds);
        self.entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory cache mutex poisoned: {}", e))?
            .insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory cache mutex poisoned: {}", e))?;

        match entries.get(key) {
            Some((_, expires)) if *expires <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), anyhow::Error> {
        self.entries
            .lock()
            .map_err(|e| anyhow::anyhow!("Memory cache mutex poisoned: {}", e))?
            .remove(key);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_put_and_get_round_trip() -> Result<(), anyhow::Error> {
        let store = Arc::new(MemoryCache::new());
        let cache = PairingCodeCache::new(store.clone());
        let now = Utc::now();
        let state = PairingCodeState {
            user_id: Uuid::new_v4(),
            activated: false,
            expires_at: now.timestamp() + 600,
        };

        cache.put("123456", &state, now).await?;

        assert!(store.raw("tv_code:123456").is_some());
        assert_eq!(cache.get("123456").await?, Some(state));

        cache.evict("123456").await?;
        assert_eq!(cache.get("123456").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_state_is_not_written() -> Result<(), anyhow::Error> {
        let store = Arc::new(MemoryCache::new());
        let cache = PairingCodeCache::new(store.clone());
        let now = Utc::now();
        let state = PairingCodeState {
            user_id: Uuid::new_v4(),
            activated: true,
            expires_at: now.timestamp(),
        };

        cache.put("654321", &state, now).await?;
        assert!(store.raw("tv_code:654321").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_entry_is_a_miss() -> Result<(), anyhow::Error> {
        let store = Arc::new(MemoryCache::new());
        store.set("tv_code:000000", "not json", 60).await?;

        let cache = PairingCodeCache::new(store);
        assert_eq!(cache.get("000000").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_memory_cache_ttl() -> Result<(), anyhow::Error> {
        let store = MemoryCache::new();
        store.set("k", "v", 0).await?;
        assert_eq!(store.get("k").await?, None);

        store.set("k", "v", 60).await?;
        assert_eq!(store.get("k").await?, Some("v".to_string()));
        Ok(())
    }
}
