//! Remote-Cache Session Store Implementation
//!
//! Delegates record storage to an external key/value cache (Redis by default).
//! Each record is one cache entry keyed by `key_prefix + session_id`, holding the
//! MessagePack encoding of the record's `HashMap<String, Value>`.
//!
//! # Consistency
//!
//! There is no local locking. Reads are GET followed by a re-SET with the same TTL
//! (keep-alive); writes read the whole blob, merge one key and write it back with a
//! fresh TTL. Two concurrent `set_value` calls on *different* keys of the same
//! session can therefore lose one writer's update. Use the in-memory store when
//! per-session linearizability matters.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::{SessionConfig, SessionStore, SessionStoreError};

type SessionValues = HashMap<String, Value>;

/// The three cache operations the remote store relies on
///
/// Mirrors `SET key value EX seconds`, `GET key` and `DEL key`.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Store `value` under `key`, expiring after `ttl_secs`
    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl_secs: u64)
    -> Result<(), SessionStoreError>;

    /// Fetch the value under `key`, if present
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionStoreError>;

    /// Delete `key` (deleting a missing key is not an error)
    async fn del(&self, key: &str) -> Result<(), SessionStoreError>;
}

/// Session store backed by a remote key/value cache with TTL refresh on access
pub struct RemoteCacheSessionStore<C> {
    cache: C,
    config: SessionConfig,
    key_prefix: String,
}

impl<C: CacheBackend> RemoteCacheSessionStore<C> {
    /// Create a store over an already-connected cache backend
    pub fn new(cache: C, config: SessionConfig, key_prefix: impl Into<String>) -> Self {
        Self {
            cache,
            config,
            key_prefix: key_prefix.into(),
        }
    }

    /// Access the underlying cache backend
    pub fn cache(&self) -> &C {
        &self.cache
    }

    fn cache_key(&self, session_id: &str) -> String {
        format!("{}{}", self.key_prefix, session_id)
    }

    fn ttl_secs(&self) -> u64 {
        self.config.effective_lifetime_secs()
    }

    /// Fetch and decode a record; undecodable blobs count as missing and are deleted
    ///
    /// Returns the raw bytes alongside the decoded map so callers can refresh the
    /// TTL without re-encoding.
    async fn load(
        &self,
        key: &str,
    ) -> Result<Option<(Vec<u8>, SessionValues)>, SessionStoreError> {
        let Some(bytes) = self.cache.get(key).await? else {
            return Ok(None);
        };
        match rmp_serde::from_slice::<SessionValues>(&bytes) {
            Ok(values) => Ok(Some((bytes, values))),
            Err(err) => {
                debug!("Discarding undecodable session blob {}: {}", key, err);
                self.cache.del(key).await?;
                Ok(None)
            }
        }
    }

    async fn store(&self, key: &str, values: &SessionValues) -> Result<(), SessionStoreError> {
        let bytes = rmp_serde::to_vec_named(values)?;
        self.cache.set_ex(key, bytes, self.ttl_secs()).await
    }
}

#[cfg(feature = "redis")]
impl RemoteCacheSessionStore<RedisCache> {
    /// Connect to Redis and build a store over it
    pub async fn connect(
        config: SessionConfig,
        remote: crate::RemoteCacheConfig,
    ) -> Result<Self, SessionStoreError> {
        let cache = RedisCache::connect(&remote.url).await?;
        Ok(Self::new(cache, config, remote.key_prefix))
    }
}

#[async_trait]
impl<C: CacheBackend> SessionStore for RemoteCacheSessionStore<C> {
    fn backend_name(&self) -> &'static str {
        "RemoteCache"
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn allocate(&self, session_id: &str) -> Result<(), SessionStoreError> {
        self.store(&self.cache_key(session_id), &SessionValues::new())
            .await
    }

    async fn touch(&self, session_id: &str) -> Result<bool, SessionStoreError> {
        let key = self.cache_key(session_id);
        match self.load(&key).await? {
            Some((bytes, _)) => {
                self.cache.set_ex(&key, bytes, self.ttl_secs()).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, session_id: &str) -> Result<(), SessionStoreError> {
        self.cache.del(&self.cache_key(session_id)).await
    }

    async fn get_value(
        &self,
        session_id: &str,
        key: &str,
    ) -> Result<Option<Value>, SessionStoreError> {
        let cache_key = self.cache_key(session_id);
        let Some((bytes, mut values)) = self.load(&cache_key).await? else {
            return Ok(None);
        };
        self.cache.set_ex(&cache_key, bytes, self.ttl_secs()).await?;
        Ok(values.remove(key))
    }

    async fn set_value(
        &self,
        session_id: &str,
        key: &str,
        value: Value,
    ) -> Result<bool, SessionStoreError> {
        let cache_key = self.cache_key(session_id);
        let Some((_, mut values)) = self.load(&cache_key).await? else {
            return Ok(false);
        };
        values.insert(key.to_string(), value);
        self.store(&cache_key, &values).await?;
        Ok(true)
    }

    async fn remove_value(
        &self,
        session_id: &str,
        key: &str,
    ) -> Result<Option<Value>, SessionStoreError> {
        let cache_key = self.cache_key(session_id);
        let Some((_, mut values)) = self.load(&cache_key).await? else {
            return Ok(None);
        };
        let removed = values.remove(key);
        self.store(&cache_key, &values).await?;
        Ok(removed)
    }

    async fn session_ids(&self) -> Result<Vec<String>, SessionStoreError> {
        // Enumerating keys would need SCAN over the shared keyspace
        Ok(Vec::new())
    }
}

#[cfg(feature = "redis")]
pub use redis_cache::RedisCache;

#[cfg(feature = "redis")]
mod redis_cache {
    use async_trait::async_trait;
    use redis::AsyncCommands;
    use redis::aio::ConnectionManager;
    use tracing::info;

    use super::CacheBackend;
    use crate::SessionStoreError;

    /// Redis-backed [`CacheBackend`] over a reconnecting connection manager
    #[derive(Clone)]
    pub struct RedisCache {
        connection: ConnectionManager,
    }

    impl RedisCache {
        /// Open a managed connection to the Redis server at `url`
        pub async fn connect(url: &str) -> Result<Self, SessionStoreError> {
            let client = redis::Client::open(url)?;
            let connection = ConnectionManager::new(client).await?;
            info!("Connected to session cache at {}", url);
            Ok(Self { connection })
        }
    }

    #[async_trait]
    impl CacheBackend for RedisCache {
        async fn set_ex(
            &self,
            key: &str,
            value: Vec<u8>,
            ttl_secs: u64,
        ) -> Result<(), SessionStoreError> {
            let mut connection = self.connection.clone();
            connection.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SessionStoreError> {
            let mut connection = self.connection.clone();
            Ok(connection.get::<_, Option<Vec<u8>>>(key).await?)
        }

        async fn del(&self, key: &str) -> Result<(), SessionStoreError> {
            let mut connection = self.connection.clone();
            connection.del::<_, ()>(key).await?;
            Ok(())
        }
    }
}
