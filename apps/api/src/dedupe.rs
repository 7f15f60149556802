//! Deduplication cache.
//!
//! Every message and thread id gets a TTL-backed marker on first sight so
//! overlapping or repeated runs never reply to the same application twice.
//! Cache failures are swallowed and treated as "not duplicate": over-processing
//! beats silently dropping a candidate's mail.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;
use thiserror::Error;
use tracing::warn;

/// Markers expire after one hour; a reprocessing window is acceptable past it.
pub const DEDUPE_TTL_SECS: u64 = 3600;

const SENTINEL: &str = "1";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Minimal TTL key-value capability the guard runs against.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;
}

/// Redis-backed store used in production.
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.get(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }
}

/// In-process store backing the guard in tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(key) {
            Some((_, expires)) if *expires <= Instant::now() => {
                entries.remove(key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let expires = Instant::now() + Duration::from_secs(ttl_secs);
        self.entries
            .lock()
            .expect("cache mutex poisoned")
            .insert(key.to_string(), (value.to_string(), expires));
        Ok(())
    }
}

/// What kind of id a dedupe key tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupeKind {
    Email,
    Thread,
}

impl DedupeKind {
    fn key(&self, id: &str) -> String {
        match self {
            DedupeKind::Email => format!("processed_email:{id}"),
            DedupeKind::Thread => format!("processed_thread:{id}"),
        }
    }
}

/// First-sight guard over a [`CacheStore`].
pub struct DedupeGuard {
    store: Arc<dyn CacheStore>,
    ttl_secs: u64,
}

impl DedupeGuard {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            ttl_secs: DEDUPE_TTL_SECS,
        }
    }

    #[cfg(test)]
    fn with_ttl(store: Arc<dyn CacheStore>, ttl_secs: u64) -> Self {
        Self { store, ttl_secs }
    }

    /// Returns `true` exactly once per id within the TTL window, marking the
    /// id seen as a side effect. An existing marker is NOT refreshed: the
    /// window is fixed to first sight.
    ///
    /// Fail-open: any cache error logs and reports "new".
    pub async fn should_process(&self, kind: DedupeKind, id: &str) -> bool {
        let key = kind.key(id);
        match self.store.get(&key).await {
            Ok(Some(_)) => return false,
            Ok(None) => {}
            Err(e) => {
                warn!("dedupe lookup failed for {key}, processing anyway: {e}");
                return true;
            }
        }
        if let Err(e) = self.store.set_ex(&key, SENTINEL, self.ttl_secs).await {
            warn!("failed to mark {key} as processed: {e}");
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_sight_is_processed() {
        let guard = DedupeGuard::new(Arc::new(MemoryStore::new()));
        assert!(guard.should_process(DedupeKind::Email, "m1").await);
    }

    #[tokio::test]
    async fn test_second_sight_is_skipped() {
        let guard = DedupeGuard::new(Arc::new(MemoryStore::new()));
        assert!(guard.should_process(DedupeKind::Email, "m1").await);
        assert!(!guard.should_process(DedupeKind::Email, "m1").await);
    }

    #[tokio::test]
    async fn test_email_and_thread_keys_are_independent() {
        let guard = DedupeGuard::new(Arc::new(MemoryStore::new()));
        assert!(guard.should_process(DedupeKind::Email, "x").await);
        assert!(guard.should_process(DedupeKind::Thread, "x").await);
        assert!(!guard.should_process(DedupeKind::Thread, "x").await);
    }

    #[tokio::test]
    async fn test_marker_expires_after_ttl() {
        let guard = DedupeGuard::with_ttl(Arc::new(MemoryStore::new()), 0);
        assert!(guard.should_process(DedupeKind::Email, "m1").await);
        // TTL of zero expires immediately; the id reads as new again.
        assert!(guard.should_process(DedupeKind::Email, "m1").await);
    }

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "connection refused",
            ))))
        }

        async fn set_ex(&self, _key: &str, _value: &str, _ttl: u64) -> Result<(), CacheError> {
            Err(CacheError::Redis(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "connection refused",
            ))))
        }
    }

    #[tokio::test]
    async fn test_cache_failure_is_fail_open() {
        let guard = DedupeGuard::new(Arc::new(BrokenStore));
        assert!(guard.should_process(DedupeKind::Email, "m1").await);
        assert!(guard.should_process(DedupeKind::Email, "m1").await);
    }
}
