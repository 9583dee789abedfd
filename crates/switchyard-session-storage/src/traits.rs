//! Session Store Trait and Record Types
//!
//! This module provides the core SessionStore trait abstraction shared by every
//! backend. Both backends satisfy the identical contract:
//! - InMemory: process-local, linearizable under a read/write lock
//! - RemoteCache: external key/value cache, TTL refreshed on access, no local locking
//!
//! The cookie-facing operations (`create`, `invalidate`, `validate`, `get`, `set`)
//! are provided here on top of a small set of keyed primitives each backend implements.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::SessionConfig;
use crate::cookie::{expire_session_cookie, issue_session_cookie, read_session_cookie};
use crate::id::generate_session_id;

/// Snapshot of one session record
///
/// Records are owned by the store that created them; callers only ever see clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque session identifier (also the cookie value)
    pub id: String,
    /// Last access timestamp (Unix millis)
    pub last_access_time: u64,
    /// Session key-value store
    pub values: HashMap<String, Value>,
}

impl SessionRecord {
    /// Create an empty record stamped with the current time
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            last_access_time: now_millis(),
            values: HashMap::new(),
        }
    }

    /// Check whether the record has been idle longer than `max_lifetime_secs` at `now`
    ///
    /// Times are Unix millis; very large lifetimes saturate and never expire.
    pub fn is_expired_at(&self, max_lifetime_secs: u64, now: u64) -> bool {
        expiry_deadline(self.last_access_time, max_lifetime_secs) < now
    }
}

/// Last instant (Unix millis) a record accessed at `last_access` is still live
pub(crate) fn expiry_deadline(last_access: u64, max_lifetime_secs: u64) -> u64 {
    last_access.saturating_add(max_lifetime_secs.saturating_mul(1000))
}

/// Current wall-clock time in Unix millis
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis() as u64
}

/// Core trait for session store backends
///
/// Implementors supply the keyed primitives; the cookie-bound operations are
/// provided on top of them so every backend behaves the same at the edges.
///
/// Every successful read (`touch`, `get_value`, `validate`, `get`) extends the
/// session's life. Checking a session and keeping it alive are the same operation.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get the backend name for logging and debugging
    fn backend_name(&self) -> &'static str;

    /// Cookie binding and lifetime configuration
    fn config(&self) -> &SessionConfig;

    /// Start background maintenance (no-op unless the backend needs it)
    fn start(&self) {}

    /// Stop background maintenance started by [`SessionStore::start`]
    fn close(&self) {}

    // ============================================================================
    // Keyed primitives
    // ============================================================================

    /// Allocate an empty record under `session_id`
    async fn allocate(&self, session_id: &str) -> Result<(), SessionStoreError>;

    /// Confirm the record exists and refresh its liveness
    async fn touch(&self, session_id: &str) -> Result<bool, SessionStoreError>;

    /// Delete a record unconditionally (idempotent)
    async fn remove(&self, session_id: &str) -> Result<(), SessionStoreError>;

    /// Read one value; `None` when either the record or the key is missing
    async fn get_value(&self, session_id: &str, key: &str)
    -> Result<Option<Value>, SessionStoreError>;

    /// Write one value; `false` when the record does not exist
    async fn set_value(
        &self,
        session_id: &str,
        key: &str,
        value: Value,
    ) -> Result<bool, SessionStoreError>;

    /// Remove one value, returning it if it was present
    async fn remove_value(
        &self,
        session_id: &str,
        key: &str,
    ) -> Result<Option<Value>, SessionStoreError>;

    /// List live session ids (backends that cannot enumerate return an empty list)
    async fn session_ids(&self) -> Result<Vec<String>, SessionStoreError>;

    // ============================================================================
    // Cookie-bound operations
    // ============================================================================

    /// Create a fresh session and bind it to the response with a `Set-Cookie` header
    async fn create(&self, response: &mut HeaderMap) -> Result<String, SessionStoreError> {
        let session_id = generate_session_id();
        self.allocate(&session_id).await?;
        issue_session_cookie(response, self.config(), &session_id)?;
        debug!(backend = self.backend_name(), "Created session: {}", session_id);
        Ok(session_id)
    }

    /// End the session named by the request cookie and expire the cookie client-side
    async fn invalidate(
        &self,
        response: &mut HeaderMap,
        request: &HeaderMap,
    ) -> Result<(), SessionStoreError> {
        let Some(session_id) = read_session_cookie(request, &self.config().cookie_name) else {
            return Ok(());
        };
        self.remove(&session_id).await?;
        expire_session_cookie(response, self.config())?;
        debug!(backend = self.backend_name(), "Invalidated session: {}", session_id);
        Ok(())
    }

    /// Resolve the request cookie to a live session id, refreshing it as a side effect
    async fn validate(&self, request: &HeaderMap) -> Result<Option<String>, SessionStoreError> {
        let Some(session_id) = read_session_cookie(request, &self.config().cookie_name) else {
            return Ok(None);
        };
        if self.touch(&session_id).await? {
            Ok(Some(session_id))
        } else {
            Ok(None)
        }
    }

    /// Read a value from the session named by the request cookie (never creates)
    async fn get(
        &self,
        request: &HeaderMap,
        key: &str,
    ) -> Result<Option<Value>, SessionStoreError> {
        let Some(session_id) = read_session_cookie(request, &self.config().cookie_name) else {
            return Ok(None);
        };
        self.get_value(&session_id, key).await
    }

    /// Write a value into the session named by the request cookie (never creates)
    async fn set(
        &self,
        request: &HeaderMap,
        key: &str,
        value: Value,
    ) -> Result<bool, SessionStoreError> {
        let Some(session_id) = read_session_cookie(request, &self.config().cookie_name) else {
            return Ok(false);
        };
        self.set_value(&session_id, key, value).await
    }
}

/// Shared, type-erased session store
pub type SharedSessionStore = Arc<dyn SessionStore>;

/// Unified error type for all session store backends
#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("Session store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),
}

impl From<rmp_serde::encode::Error> for SessionStoreError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        SessionStoreError::Serialization(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for SessionStoreError {
    fn from(err: redis::RedisError) -> Self {
        SessionStoreError::StoreUnavailable(err.to_string())
    }
}
