use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use super::ServiceError;
use crate::utils::random_hex;

/// Delay between acquisition attempts while waiting for a lock.
const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Exclusive, self-expiring locks keyed by string.
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Takes `key` for `owner` unless someone else holds it. The lock lapses
    /// by itself after `hold`.
    async fn try_acquire(
        &self,
        key: &str,
        owner: &str,
        hold: Duration,
    ) -> Result<bool, anyhow::Error>;

    /// Drops `key` only if `owner` still holds it.
    async fn release(&self, key: &str, owner: &str) -> Result<(), anyhow::Error>;
}

/// How long a lock may be held and how long to wait for it.
#[derive(Debug, Clone, Copy)]
pub struct LockBudget {
    pub hold: Duration,
    pub wait: Duration,
}

impl Default for LockBudget {
    fn default() -> Self {
        Self {
            hold: Duration::from_secs(10),
            wait: Duration::from_secs(5),
        }
    }
}

/// Runs `f` while holding `key`. Fails with `LockTimeout` if the lock cannot
/// be taken within `budget.wait`. The lock is released whatever `f` returns.
pub async fn with_lock<T, F, Fut>(
    locks: &dyn LockManager,
    key: &str,
    budget: LockBudget,
    f: F,
) -> Result<T, ServiceError>
where
    F: FnOnce() -> Fut + Send,
    Fut: Future<Output = Result<T, ServiceError>> + Send,
{
    let owner = random_hex(16);
    let deadline = Instant::now() + budget.wait;

    loop {
        if locks
            .try_acquire(key, &owner, budget.hold)
            .await
            .map_err(ServiceError::Cache)?
        {
            break;
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::warn!(lock = %key, "Lock wait budget exhausted");
            return Err(ServiceError::LockTimeout);
        }
        tokio::time::sleep(RETRY_INTERVAL.min(deadline - now)).await;
    }

    let result = f().await;

    if let Err(e) = locks.release(key, &owner).await {
        // The hold budget frees it eventually.
        tracing::warn!(lock = %key, error = %e, "Failed to release lock");
    }

    result
}

/// Process-local `LockManager`.
#[derive(Default)]
pub struct InMemoryLockManager {
    locks: DashMap<String, (String, Instant)>,
}

impl InMemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockManager for InMemoryLockManager {
    async fn try_acquire(
        &self,
        key: &str,
        owner: &str,
        hold: Duration,
    ) -> Result<bool, anyhow::Error> {
        let now = Instant::now();
        match self.locks.entry(key.to_string()) {
            Entry::Occupied(mut held) => {
                if held.get().1 <= now {
                    held.insert((owner.to_string(), now + hold));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(free) => {
                free.insert((owner.to_string(), now + hold));
                Ok(true)
            }
        }
    }

    async fn release(&self, key: &str, owner: &str) -> Result<(), anyhow::Error> {
        self.locks.remove_if(key, |_, (holder, _)| holder == owner);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_acquire_is_exclusive() -> Result<(), anyhow::Error> {
        let locks = InMemoryLockManager::new();
        let hold = Duration::from_secs(10);

        assert!(locks.try_acquire("lock:a", "one", hold).await?);
        assert!(!locks.try_acquire("lock:a", "two", hold).await?);
        assert!(locks.try_acquire("lock:b", "two", hold).await?);

        // Releasing with the wrong owner is a no-op.
        locks.release("lock:a", "two").await?;
        assert!(!locks.try_acquire("lock:a", "two", hold).await?);

        locks.release("lock:a", "one").await?;
        assert!(locks.try_acquire("lock:a", "two", hold).await?);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_budget_expires() -> Result<(), anyhow::Error> {
        let locks = InMemoryLockManager::new();
        assert!(locks.try_acquire("lock:a", "one", Duration::from_secs(10)).await?);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(locks.try_acquire("lock:a", "two", Duration::from_secs(10)).await?);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_lock_times_out() {
        let locks = InMemoryLockManager::new();
        let budget = LockBudget {
            hold: Duration::from_secs(10),
            wait: Duration::from_millis(200),
        };
        assert!(matches!(
            locks.try_acquire("lock:a", "other", budget.hold).await,
            Ok(true)
        ));

        let result = with_lock(&locks, "lock:a", budget, || async { Ok(()) }).await;
        assert!(matches!(result, Err(ServiceError::LockTimeout)));
    }

    #[tokio::test]
    async fn test_with_lock_releases_on_error() -> Result<(), anyhow::Error> {
        let locks = InMemoryLockManager::new();
        let result: Result<(), ServiceError> =
            with_lock(&locks, "lock:a", LockBudget::default(), || async {
                Err(ServiceError::NotFound("Code"))
            })
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));

        assert!(locks.try_acquire("lock:a", "next", Duration::from_secs(1)).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_with_lock_serialises_critical_sections() {
        let locks = Arc::new(InMemoryLockManager::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                with_lock(locks.as_ref(), "lock:shared", LockBudget::default(), || async move {
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
            }));
        }

        for handle in handles {
            assert!(matches!(handle.await, Ok(Ok(()))));
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
