//! # Session Storage Abstractions and Implementations
//!
//! **Cookie-bound session storage with interchangeable backends.**
//!
//! Provides the core [`SessionStore`] trait with two implementations that satisfy the
//! identical contract but differ in consistency and latency:
//!
//! - [`InMemorySessionStore`]: process-local, linearizable per session, swept periodically
//! - [`RemoteCacheSessionStore`]: external key/value cache (Redis), TTL refreshed on access,
//!   read-modify-write without local locking
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! switchyard-session-storage = "0.1"
//!
//! # Without the Redis client
//! switchyard-session-storage = { version = "0.1", default-features = false, features = ["in-memory"] }
//! ```

// Core trait and types
mod traits;
/// Core session store trait, record and error types
pub use traits::*;

mod config;
pub use config::{MAX_LIFETIME_SECS, RemoteCacheConfig, SessionConfig};

pub mod cookie;
pub mod handle;
pub mod id;

// Implementations
pub mod in_memory;
pub mod prelude;
pub mod remote_cache;

// Re-export for convenience
pub use handle::SessionHandle;
pub use id::generate_session_id;
/// In-memory session store for development and single-instance deployments
pub use in_memory::{InMemorySessionStore, InMemoryStats};
/// Remote-cache session store and its cache seam
pub use remote_cache::{CacheBackend, RemoteCacheSessionStore};

#[cfg(feature = "redis")]
/// Redis implementation of the cache seam
pub use remote_cache::RedisCache;

/// Create a default in-memory session store for development and testing
pub fn create_default_store() -> InMemorySessionStore {
    InMemorySessionStore::new()
}

/// Create an in-memory session store with custom cookie and lifetime settings
pub fn create_memory_store(config: SessionConfig) -> InMemorySessionStore {
    InMemorySessionStore::with_config(config)
}

/// Connect a Redis-backed session store
#[cfg(feature = "redis")]
pub async fn create_redis_store(
    config: SessionConfig,
    remote: RemoteCacheConfig,
) -> Result<RemoteCacheSessionStore<RedisCache>, SessionStoreError> {
    RemoteCacheSessionStore::connect(config, remote).await
}
