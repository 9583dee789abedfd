//! In-Memory Session Store Implementation
//!
//! This implementation stores all session records in memory using Arc<RwLock<>>
//! for thread safety. Suitable for:
//! - Development and testing
//! - Single-instance deployments where sessions need not survive a restart
//!
//! Read-only operations take the shared lock; the last-access marker is atomic so
//! reads can refresh it without upgrading. Mutations take the exclusive lock.
//! Expiry is a single cancellable sweep task that runs every `max_lifetime_secs`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::traits::expiry_deadline;
use crate::{SessionConfig, SessionRecord, SessionStore, SessionStoreError, now_millis};

type SessionMap = HashMap<String, MemoryEntry>;

/// Stored form of a record; `last_access` is refreshed under the shared lock
#[derive(Debug)]
struct MemoryEntry {
    last_access: AtomicU64,
    values: HashMap<String, Value>,
}

impl MemoryEntry {
    fn new() -> Self {
        Self {
            last_access: AtomicU64::new(now_millis()),
            values: HashMap::new(),
        }
    }

    fn touch(&self) {
        self.last_access.store(now_millis(), Ordering::Relaxed);
    }

    fn last_access(&self) -> u64 {
        self.last_access.load(Ordering::Relaxed)
    }
}

/// In-memory session store with a periodic expiry sweep
#[derive(Debug)]
pub struct InMemorySessionStore {
    /// All records by session ID
    sessions: Arc<RwLock<SessionMap>>,
    /// Configuration
    config: SessionConfig,
    /// Cancellation handle of the running sweep, if any
    sweeper: Mutex<Option<CancellationToken>>,
}

/// Statistics for in-memory storage
#[derive(Debug, Clone)]
pub struct InMemoryStats {
    pub session_count: usize,
    pub max_lifetime_secs: u64,
    pub sweeper_running: bool,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionStore {
    /// Create new in-memory session store with default configuration
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Create new in-memory session store with custom configuration
    ///
    /// The sweep is not running yet; call [`SessionStore::start`] from inside a
    /// tokio runtime (the server does this when it starts serving).
    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
            sweeper: Mutex::new(None),
        }
    }

    /// Start the expiry sweep; returns `false` if one is already pending
    pub fn start_sweeper(&self) -> bool {
        let Ok(mut sweeper) = self.sweeper.lock() else {
            return false;
        };
        if sweeper.is_some() {
            return false;
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let sessions = Arc::clone(&self.sessions);
        let max_lifetime_secs = self.config.effective_lifetime_secs();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(max_lifetime_secs));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => {
                        debug!("Session sweep stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let now = now_millis();
                        let expired = expire_entries(&sessions, max_lifetime_secs, now).await;
                        if !expired.is_empty() {
                            info!(expired = expired.len(), "Session sweep completed");
                        }
                    }
                }
            }
        });

        *sweeper = Some(token);
        info!(interval_secs = max_lifetime_secs, "Session sweep started");
        true
    }

    /// Cancel the expiry sweep if it is running
    pub fn stop_sweeper(&self) {
        if let Ok(mut sweeper) = self.sweeper.lock()
            && let Some(token) = sweeper.take()
        {
            token.cancel();
        }
    }

    /// Remove every record idle longer than the configured lifetime as of `now` (Unix millis)
    ///
    /// This is the sweep body; exposed for maintenance and deterministic tests.
    pub async fn expire_idle(&self, now: u64) -> Vec<String> {
        expire_entries(&self.sessions, self.config.effective_lifetime_secs(), now).await
    }

    /// Last access timestamp (Unix millis) of a record, without refreshing it
    pub async fn last_access_time(&self, session_id: &str) -> Option<u64> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(MemoryEntry::last_access)
    }

    /// Clone of a record, without refreshing it
    pub async fn snapshot(&self, session_id: &str) -> Option<SessionRecord> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map(|entry| SessionRecord {
            id: session_id.to_string(),
            last_access_time: entry.last_access(),
            values: entry.values.clone(),
        })
    }

    /// Get current statistics
    pub async fn stats(&self) -> InMemoryStats {
        let sessions = self.sessions.read().await;
        let sweeper_running = self
            .sweeper
            .lock()
            .map(|sweeper| sweeper.is_some())
            .unwrap_or(false);

        InMemoryStats {
            session_count: sessions.len(),
            max_lifetime_secs: self.config.max_lifetime_secs,
            sweeper_running,
        }
    }

    #[cfg(test)]
    async fn set_last_access(&self, session_id: &str, millis: u64) {
        let sessions = self.sessions.read().await;
        if let Some(entry) = sessions.get(session_id) {
            entry.last_access.store(millis, Ordering::Relaxed);
        }
    }
}

impl Drop for InMemorySessionStore {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}

async fn expire_entries(
    sessions: &RwLock<SessionMap>,
    max_lifetime_secs: u64,
    now: u64,
) -> Vec<String> {
    let mut sessions = sessions.write().await;

    let mut expired = Vec::new();
    sessions.retain(|session_id, entry| {
        if expiry_deadline(entry.last_access(), max_lifetime_secs) < now {
            expired.push(session_id.clone());
            false
        } else {
            true
        }
    });

    for session_id in &expired {
        debug!("Expired session: {}", session_id);
    }
    expired
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn backend_name(&self) -> &'static str {
        "InMemory"
    }

    fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn start(&self) {
        self.start_sweeper();
    }

    fn close(&self) {
        self.stop_sweeper();
    }

    async fn allocate(&self, session_id: &str) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id.to_string(), MemoryEntry::new());
        Ok(())
    }

    async fn touch(&self, session_id: &str) -> Result<bool, SessionStoreError> {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(entry) => {
                entry.touch();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, session_id: &str) -> Result<(), SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(session_id).is_some() {
            debug!("Removed session: {}", session_id);
        }
        Ok(())
    }

    async fn get_value(
        &self,
        session_id: &str,
        key: &str,
    ) -> Result<Option<Value>, SessionStoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).and_then(|entry| {
            entry.touch();
            entry.values.get(key).cloned()
        }))
    }

    async fn set_value(
        &self,
        session_id: &str,
        key: &str,
        value: Value,
    ) -> Result<bool, SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(entry) => {
                entry.values.insert(key.to_string(), value);
                entry.touch();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_value(
        &self,
        session_id: &str,
        key: &str,
    ) -> Result<Option<Value>, SessionStoreError> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.get_mut(session_id).and_then(|entry| {
            entry.touch();
            entry.values.remove(key)
        }))
    }

    async fn session_ids(&self) -> Result<Vec<String>, SessionStoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{COOKIE, SET_COOKIE};
    use http::{HeaderMap, HeaderValue};
    use serde_json::json;

    fn store() -> InMemorySessionStore {
        InMemorySessionStore::with_config(SessionConfig::new("sid").max_lifetime_secs(60))
    }

    fn request_for(session_id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("sid={}", session_id)).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let storage = store();
        let mut response = HeaderMap::new();

        // Create session
        let session_id = storage.create(&mut response).await.unwrap();
        assert!(response.get(SET_COOKIE).is_some());

        // Validate session
        let request = request_for(&session_id);
        assert_eq!(
            storage.validate(&request).await.unwrap(),
            Some(session_id.clone())
        );

        // Invalidate session
        let mut response = HeaderMap::new();
        storage.invalidate(&mut response, &request).await.unwrap();
        let set_cookie = response.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(set_cookie.contains("Max-Age=-1"));

        // Verify deletion
        assert_eq!(storage.validate(&request).await.unwrap(), None);
        assert!(storage.snapshot(&session_id).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_without_cookie_is_noop() {
        let storage = store();
        let mut response = HeaderMap::new();
        storage
            .invalidate(&mut response, &HeaderMap::new())
            .await
            .unwrap();
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_session_values() {
        let storage = store();
        let session_id = storage.create(&mut HeaderMap::new()).await.unwrap();

        // Set value
        let value = json!({"user": "alice", "roles": ["admin"], "visits": 3});
        assert!(storage.set_value(&session_id, "profile", value.clone()).await.unwrap());

        // Get value
        let retrieved = storage.get_value(&session_id, "profile").await.unwrap();
        assert_eq!(retrieved, Some(value.clone()));

        // Remove value
        let removed = storage.remove_value(&session_id, "profile").await.unwrap();
        assert_eq!(removed, Some(value));

        // Verify removal
        assert_eq!(storage.get_value(&session_id, "profile").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_session_reports_not_found() {
        let storage = store();
        assert_eq!(storage.get_value("nope", "k").await.unwrap(), None);
        assert!(!storage.set_value("nope", "k", json!(1)).await.unwrap());
        assert!(!storage.touch("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_cookie_forms_never_create() {
        let storage = store();
        let request = request_for("ghost");

        assert!(!storage.set(&request, "k", json!(1)).await.unwrap());
        assert_eq!(storage.get(&request, "k").await.unwrap(), None);
        assert!(!storage.set(&HeaderMap::new(), "k", json!(1)).await.unwrap());
        assert!(storage.session_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let storage = store();
        let session_id = storage.create(&mut HeaderMap::new()).await.unwrap();

        storage.remove(&session_id).await.unwrap();
        storage.remove(&session_id).await.unwrap();
        assert!(storage.session_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expire_idle_removes_exactly_stale_records() {
        let storage = store();
        let stale = storage.create(&mut HeaderMap::new()).await.unwrap();
        let fresh = storage.create(&mut HeaderMap::new()).await.unwrap();
        let boundary = storage.create(&mut HeaderMap::new()).await.unwrap();

        let now = 10_000_000;
        storage.set_last_access(&stale, now - 60_001).await;
        storage.set_last_access(&fresh, now - 1_000).await;
        // last_access + lifetime == now is not yet expired
        storage.set_last_access(&boundary, now - 60_000).await;

        let expired = storage.expire_idle(now).await;
        assert_eq!(expired, vec![stale.clone()]);

        let mut remaining = storage.session_ids().await.unwrap();
        remaining.sort();
        let mut expected = vec![fresh, boundary];
        expected.sort();
        assert_eq!(remaining, expected);
    }

    #[tokio::test]
    async fn test_access_refreshes_last_access() {
        let storage = store();
        let session_id = storage.create(&mut HeaderMap::new()).await.unwrap();
        storage.set_last_access(&session_id, 1).await;

        storage.validate(&request_for(&session_id)).await.unwrap();
        let refreshed = storage.last_access_time(&session_id).await.unwrap();
        assert!(refreshed > 1);

        // Accessed after the threshold, so the sweep must keep it
        let expired = storage.expire_idle(refreshed + 60_000).await;
        assert!(expired.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_is_single_instance() {
        let storage = store();
        assert!(storage.start_sweeper());
        assert!(!storage.start_sweeper());
        assert!(storage.stats().await.sweeper_running);

        storage.close();
        assert!(!storage.stats().await.sweeper_running);

        // Can be restarted after a clean stop
        assert!(storage.start_sweeper());
        storage.close();
    }

    #[tokio::test]
    async fn test_unbounded_lifetime_keeps_sessions() {
        let config = SessionConfig::new("sid").max_lifetime_secs(u64::MAX);
        let storage = InMemorySessionStore::with_config(config);
        let session_id = storage.create(&mut HeaderMap::new()).await.unwrap();

        assert!(storage.expire_idle(now_millis()).await.is_empty());
        assert!(storage.snapshot(&session_id).await.is_some());

        // Sweep interval is capped, so the task starts and stops cleanly
        assert!(storage.start_sweeper());
        storage.close();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access_loses_no_writes() {
        let storage = Arc::new(store());
        let session_id = storage.create(&mut HeaderMap::new()).await.unwrap();
        let request = request_for(&session_id);

        let mut tasks = Vec::new();
        for i in 0..64 {
            let storage = Arc::clone(&storage);
            let session_id = session_id.clone();
            let request = request.clone();
            tasks.push(tokio::spawn(async move {
                let key = format!("key-{}", i);
                assert!(storage.set_value(&session_id, &key, json!(i)).await.unwrap());
                assert_eq!(
                    storage.validate(&request).await.unwrap(),
                    Some(session_id.clone())
                );
                assert_eq!(storage.get_value(&session_id, &key).await.unwrap(), Some(json!(i)));
                storage.expire_idle(now_millis()).await
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_empty());
        }

        let record = storage.snapshot(&session_id).await.unwrap();
        assert_eq!(record.values.len(), 64);
        for i in 0..64 {
            assert_eq!(record.values.get(&format!("key-{}", i)), Some(&json!(i)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_expires_idle_sessions() {
        let storage = store();
        let session_id = storage.create(&mut HeaderMap::new()).await.unwrap();
        storage.set_last_access(&session_id, 1).await;

        storage.start_sweeper();
        // First tick fires immediately; let the sweep task run
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(storage.snapshot(&session_id).await.is_none());
        storage.close();
    }
}
