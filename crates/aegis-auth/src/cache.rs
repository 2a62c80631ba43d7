//! TTL-expiring cache backend for the revocation blacklist.
//!
//! Two modes:
//!
//! - **Local**: single-instance mode using only a `DashMap`; used by tests
//!   and single-node deployments.
//! - **Redis**: multi-instance mode backed by a `deadpool-redis` pool.
//!
//! Writes are awaited in both modes: a revocation entry must be durable in
//! the cache before the revoking call returns.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;

/// Errors from cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Could not obtain a connection to the cache.
    #[error("Cache connection failed: {message}")]
    Connection {
        /// Description of the connection failure.
        message: String,
    },

    /// A cache command failed.
    #[error("Cache command failed: {message}")]
    Command {
        /// Description of the command failure.
        message: String,
    },
}

/// A cached entry with TTL support (local mode).
#[derive(Clone, Debug)]
pub struct CachedEntry {
    value: String,
    stored_at: Instant,
    ttl: Duration,
}

impl CachedEntry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
            ttl,
        }
    }

    /// Returns `true` if this entry's TTL has elapsed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.stored_at.elapsed() > self.ttl
    }
}

/// Cache backend: local `DashMap` or Redis.
#[derive(Clone)]
pub enum CacheBackend {
    /// Single-instance: local DashMap only.
    Local(Arc<DashMap<String, CachedEntry>>),

    /// Multi-instance: Redis connection pool.
    Redis(Pool),
}

impl CacheBackend {
    /// Creates a new local-only cache backend.
    #[must_use]
    pub fn new_local() -> Self {
        Self::Local(Arc::new(DashMap::new()))
    }

    /// Creates a new Redis-backed cache backend from an existing pool.
    #[must_use]
    pub fn new_redis(pool: Pool) -> Self {
        Self::Redis(pool)
    }

    /// Creates a Redis-backed cache backend from a connection URL.
    ///
    /// # Errors
    /// Returns an error if the pool cannot be created from the URL.
    pub fn from_url(url: &str) -> Result<Self, CacheError> {
        let cfg = deadpool_redis::Config::from_url(url);
        let pool = cfg
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|e| CacheError::Connection {
                message: e.to_string(),
            })?;
        Ok(Self::Redis(pool))
    }

    /// Stores a value under `key` with the given TTL.
    ///
    /// The write is awaited; when this returns `Ok`, the entry is durable
    /// in the cache.
    ///
    /// # Errors
    /// Returns an error if the cache is unreachable or the write fails.
    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        match self {
            Self::Local(map) => {
                map.insert(key.to_string(), CachedEntry::new(value.to_string(), ttl));
                Ok(())
            }
            Self::Redis(pool) => {
                let mut conn = pool.get().await.map_err(|e| CacheError::Connection {
                    message: e.to_string(),
                })?;
                conn.set_ex::<_, _, ()>(key, value, ttl.as_secs())
                    .await
                    .map_err(|e| CacheError::Command {
                        message: e.to_string(),
                    })?;
                tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "cache set");
                Ok(())
            }
        }
    }

    /// Fetches the value under `key`, if present and unexpired.
    ///
    /// # Errors
    /// Returns an error if the cache is unreachable or the read fails;
    /// absence is `Ok(None)`, not an error.
    pub async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self {
            Self::Local(map) => {
                if let Some(entry) = map.get(key) {
                    if !entry.is_expired() {
                        return Ok(Some(entry.value.clone()));
                    }
                    // Drop the guard before removing to avoid deadlock.
                    drop(entry);
                    map.remove(key);
                }
                Ok(None)
            }
            Self::Redis(pool) => {
                let mut conn = pool.get().await.map_err(|e| CacheError::Connection {
                    message: e.to_string(),
                })?;
                conn.get::<_, Option<String>>(key)
                    .await
                    .map_err(|e| CacheError::Command {
                        message: e.to_string(),
                    })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_set_get() {
        let cache = CacheBackend::new_local();
        cache
            .set("revoked:abc", "blocked", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(
            cache.get("revoked:abc").await.unwrap(),
            Some("blocked".to_string())
        );
        assert_eq!(cache.get("revoked:missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_local_entry_expires() {
        let cache = CacheBackend::new_local();
        cache
            .set("revoked:abc", "blocked", Duration::ZERO)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.get("revoked:abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_local_overwrite() {
        let cache = CacheBackend::new_local();
        cache
            .set("k", "first", Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set("k", "second", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("second".to_string()));
    }

    #[test]
    fn test_from_url_rejects_garbage() {
        assert!(CacheBackend::from_url("not a url").is_err());
    }
}
