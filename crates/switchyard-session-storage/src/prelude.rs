//! # Session Storage Prelude
//!
//! This module provides convenient re-exports of the most commonly used types
//! from the session storage library.
//!
//! ```rust
//! use switchyard_session_storage::prelude::*;
//! ```

// Core trait and types
pub use crate::traits::{SessionRecord, SessionStore, SessionStoreError, SharedSessionStore};
pub use crate::{RemoteCacheConfig, SessionConfig, SessionHandle};

// Implementations
pub use crate::in_memory::{InMemorySessionStore, InMemoryStats};
pub use crate::remote_cache::{CacheBackend, RemoteCacheSessionStore};

#[cfg(feature = "redis")]
pub use crate::remote_cache::RedisCache;

// Convenience functions
pub use crate::{create_default_store, create_memory_store};

#[cfg(feature = "redis")]
pub use crate::create_redis_store;
