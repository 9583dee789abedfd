//! Session handle bound to one session id
//!
//! A small view over a shared store that remembers which session it belongs to,
//! so request code can read and write values without threading the id around.

use serde_json::Value;

use crate::{SessionStoreError, SharedSessionStore};

/// Handle to one live session in a shared store
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use serde_json::json;
/// use switchyard_session_storage::{InMemorySessionStore, SessionHandle, SessionStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
/// let id = store.create(&mut http::HeaderMap::new()).await?;
///
/// let session = SessionHandle::new(id, store);
/// session.set("visits", json!(1)).await?;
/// assert_eq!(session.get("visits").await?, Some(json!(1)));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SessionHandle {
    session_id: String,
    store: SharedSessionStore,
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("session_id", &self.session_id)
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

impl SessionHandle {
    /// Bind a handle to `session_id` in `store`
    pub fn new(session_id: impl Into<String>, store: SharedSessionStore) -> Self {
        Self {
            session_id: session_id.into(),
            store,
        }
    }

    /// Get the session identifier
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Get a value from the session
    ///
    /// - `Ok(Some(value))`: value exists
    /// - `Ok(None)`: key not found, or the session has since expired
    pub async fn get(&self, key: &str) -> Result<Option<Value>, SessionStoreError> {
        self.store.get_value(&self.session_id, key).await
    }

    /// Set a value in the session; `Ok(false)` if the session has expired
    pub async fn set(&self, key: &str, value: Value) -> Result<bool, SessionStoreError> {
        self.store.set_value(&self.session_id, key, value).await
    }

    /// Remove a value from the session
    pub async fn remove(&self, key: &str) -> Result<Option<Value>, SessionStoreError> {
        self.store.remove_value(&self.session_id, key).await
    }

    /// Delete the whole session from the store
    pub async fn destroy(&self) -> Result<(), SessionStoreError> {
        self.store.remove(&self.session_id).await
    }
}
