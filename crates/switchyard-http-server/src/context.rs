//! Per-request context handed to every handler and interceptor
//!
//! Bundles the parsed request, request-local values, and the session binding.
//! Headers the session store issues (`Set-Cookie`) are collected on a response
//! surface shared with the dispatcher, which merges them into the final response.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use hyper::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Request, Uri};
use parking_lot::Mutex;
use serde_json::Value;
use switchyard_session_storage::cookie::expire_session_cookie;
use switchyard_session_storage::{
    SessionHandle, SessionStore, SessionStoreError, SharedSessionStore,
};
use tracing::{debug, warn};
use url::form_urlencoded;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Request data plus session access for one request
///
/// # Examples
///
/// ```rust
/// use bytes::Bytes;
/// use hyper::Request;
/// use serde_json::json;
/// use switchyard_http_server::RequestContext;
///
/// let request = Request::get("/search?q=rust&page=").body(Bytes::new()).unwrap();
/// let mut ctx = RequestContext::new(request);
///
/// assert_eq!(ctx.path(), "/search");
/// assert_eq!(ctx.form_value("q", "none"), "rust");
/// assert_eq!(ctx.form_value("page", "1"), "1");
///
/// ctx.insert_local("user", json!({"id": 7}));
/// assert_eq!(ctx.local("user").unwrap()["id"], 7);
/// ```
pub struct RequestContext {
    parts: Parts,
    body: Bytes,
    session_store: Option<SharedSessionStore>,
    response_headers: Arc<Mutex<HeaderMap>>,
    // Session issued earlier in this request; the request cookie does not name it yet
    created_session: Arc<Mutex<Option<String>>>,
    locals: HashMap<String, Value>,
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("body_len", &self.body.len())
            .field("has_session_store", &self.session_store.is_some())
            .field("locals", &self.locals)
            .finish()
    }
}

impl RequestContext {
    /// Create a context for a fully buffered request, without session support
    pub fn new(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body,
            session_store: None,
            response_headers: Arc::new(Mutex::new(HeaderMap::new())),
            created_session: Arc::new(Mutex::new(None)),
            locals: HashMap::new(),
        }
    }

    /// Attach the session store used by the session accessors
    pub fn with_session_store(mut self, store: SharedSessionStore) -> Self {
        self.session_store = Some(store);
        self
    }

    // ============================================================================
    // Request data
    // ============================================================================

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Form value by key, or `default` when missing or empty
    ///
    /// A urlencoded request body is searched before the query string.
    pub fn form_value(&self, key: &str, default: &str) -> String {
        self.lookup_form(key)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    /// Collect the named form values, skipping empty values and the literal `"null"`
    pub fn form_values(&self, keys: &[&str]) -> HashMap<String, String> {
        keys.iter()
            .filter_map(|key| {
                self.lookup_form(key)
                    .filter(|value| !value.is_empty() && value != "null")
                    .map(|value| (key.to_string(), value))
            })
            .collect()
    }

    fn lookup_form(&self, key: &str) -> Option<String> {
        let from_body = if self.is_form_body() {
            find_pair(&self.body, key)
        } else {
            None
        };
        from_body.or_else(|| {
            self.parts
                .uri
                .query()
                .and_then(|query| find_pair(query.as_bytes(), key))
        })
    }

    fn is_form_body(&self) -> bool {
        self.parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with(FORM_CONTENT_TYPE))
    }

    // ============================================================================
    // Request-local values
    // ============================================================================

    /// Store a value visible to every later interceptor and the handler
    pub fn insert_local(&mut self, key: impl Into<String>, value: Value) {
        self.locals.insert(key.into(), value);
    }

    pub fn local(&self, key: &str) -> Option<&Value> {
        self.locals.get(key)
    }

    /// Add a header to the eventual response, whatever handler produces it
    pub fn append_response_header(&self, name: HeaderName, value: HeaderValue) {
        self.response_headers.lock().append(name, value);
    }

    pub(crate) fn response_surface(&self) -> Arc<Mutex<HeaderMap>> {
        Arc::clone(&self.response_headers)
    }

    // ============================================================================
    // Session binding
    // ============================================================================

    /// Live session id for this request, refreshing its lifetime
    ///
    /// A session created earlier in the same request takes precedence over the
    /// request cookie. Returns `None` without a session store.
    pub async fn session_id(&self) -> Result<Option<String>, SessionStoreError> {
        let Some(store) = &self.session_store else {
            return Ok(None);
        };
        let created = self.created_session.lock().clone();
        if let Some(session_id) = created {
            return Ok(Some(session_id));
        }
        store.validate(&self.parts.headers).await
    }

    /// Handle to the current session, if there is one
    pub async fn session(&self) -> Result<Option<SessionHandle>, SessionStoreError> {
        let Some(store) = &self.session_store else {
            return Ok(None);
        };
        Ok(self
            .session_id()
            .await?
            .map(|session_id| SessionHandle::new(session_id, Arc::clone(store))))
    }

    /// Read a value from the current session
    pub async fn session_value(&self, key: &str) -> Result<Option<Value>, SessionStoreError> {
        let Some(store) = &self.session_store else {
            return Ok(None);
        };
        match self.session_id().await? {
            Some(session_id) => store.get_value(&session_id, key).await,
            None => Ok(None),
        }
    }

    /// Write a value into the current session, creating one if none is live
    pub async fn set_session_value(
        &self,
        key: &str,
        value: Value,
    ) -> Result<bool, SessionStoreError> {
        let Some(store) = &self.session_store else {
            return Ok(false);
        };
        if let Some(session_id) = self.session_id().await?
            && store.set_value(&session_id, key, value.clone()).await?
        {
            return Ok(true);
        }
        // No live session, or the record vanished since it was validated
        match self.new_session().await? {
            Some(session_id) => store.set_value(&session_id, key, value).await,
            None => Ok(false),
        }
    }

    /// Start a fresh session and bind it to the response
    pub async fn new_session(&self) -> Result<Option<String>, SessionStoreError> {
        let Some(store) = &self.session_store else {
            return Ok(None);
        };
        let mut issued = HeaderMap::new();
        let session_id = store.create(&mut issued).await.inspect_err(|err| {
            warn!(backend = store.backend_name(), "Failed to create session: {}", err);
        })?;
        self.merge_response_headers(issued);
        *self.created_session.lock() = Some(session_id.clone());
        Ok(Some(session_id))
    }

    /// End the current session and expire its cookie
    pub async fn end_session(&self) -> Result<(), SessionStoreError> {
        let Some(store) = &self.session_store else {
            return Ok(());
        };
        let mut issued = HeaderMap::new();
        let created = self.created_session.lock().take();
        match created {
            Some(session_id) => {
                store.remove(&session_id).await?;
                expire_session_cookie(&mut issued, store.config())?;
                debug!("Ended session created in this request: {}", session_id);
            }
            None => store.invalidate(&mut issued, &self.parts.headers).await?,
        }
        self.merge_response_headers(issued);
        Ok(())
    }

    fn merge_response_headers(&self, issued: HeaderMap) {
        let mut pending = self.response_headers.lock();
        for (name, value) in issued.iter() {
            pending.append(name.clone(), value.clone());
        }
    }
}

fn find_pair(input: &[u8], key: &str) -> Option<String> {
    form_urlencoded::parse(input)
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
}
