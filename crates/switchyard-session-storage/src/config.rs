//! Session store configuration

/// Upper bound applied to the server-side lifetime (ten years)
pub const MAX_LIFETIME_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Cookie binding and lifetime settings shared by every backend
///
/// `cookie_max_age_secs` controls how long the browser keeps the cookie;
/// `max_lifetime_secs` controls how long the server keeps an idle record.
/// The two are independent and are not forced to agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Name of the session cookie
    pub cookie_name: String,
    /// Server-side idle lifetime in seconds (sweep threshold / remote TTL)
    pub max_lifetime_secs: u64,
    /// Browser-side `Max-Age` in seconds
    pub cookie_max_age_secs: i64,
    /// Mark the cookie `Secure`
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "switchyard_session".to_string(),
            max_lifetime_secs: 1800,   // 30 minutes
            cookie_max_age_secs: 1800, // 30 minutes
            secure: false,
        }
    }
}

impl SessionConfig {
    /// Create a configuration with the given cookie name and defaults elsewhere
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            ..Self::default()
        }
    }

    /// Set the server-side idle lifetime
    pub fn max_lifetime_secs(mut self, secs: u64) -> Self {
        self.max_lifetime_secs = secs;
        self
    }

    /// Set the browser-side cookie `Max-Age`
    pub fn cookie_max_age_secs(mut self, secs: i64) -> Self {
        self.cookie_max_age_secs = secs;
        self
    }

    /// Enable or disable the `Secure` cookie flag
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Lifetime used for expiry, sweep intervals and remote TTLs
    ///
    /// Clamped to `1..=MAX_LIFETIME_SECS` so timers and cache TTLs stay in range.
    pub(crate) fn effective_lifetime_secs(&self) -> u64 {
        self.max_lifetime_secs.clamp(1, MAX_LIFETIME_SECS)
    }
}

/// Configuration for the remote-cache backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCacheConfig {
    /// Connection URL of the key/value cache
    pub url: String,
    /// Prefix prepended to every session id to form the cache key
    pub key_prefix: String,
}

impl Default for RemoteCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "session:".to_string(),
        }
    }
}

impl RemoteCacheConfig {
    /// Set the connection URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the cache key prefix
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }
}
