//! Session cookie binding
//!
//! Reads the session id from a request's `Cookie` headers and issues
//! `Set-Cookie` headers on the response surface.

use ::cookie::Cookie;
use ::cookie::time::{Duration, OffsetDateTime};
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};

use crate::{SessionConfig, SessionStoreError};

/// Find the session cookie named `cookie_name`; empty values count as absent
pub fn read_session_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse_encoded(value))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Append `Set-Cookie: <name>=<id>; HttpOnly[; Secure]; Path=/; Max-Age=<secs>`
pub fn issue_session_cookie(
    headers: &mut HeaderMap,
    config: &SessionConfig,
    session_id: &str,
) -> Result<(), SessionStoreError> {
    let cookie = Cookie::build((config.cookie_name.clone(), session_id.to_string()))
        .path("/")
        .http_only(true)
        .secure(config.secure)
        .max_age(Duration::seconds(config.cookie_max_age_secs))
        .build();
    append_set_cookie(headers, cookie.encoded().to_string())
}

/// Append a cookie that the browser drops immediately
pub fn expire_session_cookie(
    headers: &mut HeaderMap,
    config: &SessionConfig,
) -> Result<(), SessionStoreError> {
    let cookie = Cookie::build((config.cookie_name.clone(), String::new()))
        .path("/")
        .http_only(true)
        .secure(config.secure)
        .max_age(Duration::seconds(-1))
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build();
    append_set_cookie(headers, cookie.encoded().to_string())
}

fn append_set_cookie(headers: &mut HeaderMap, value: String) -> Result<(), SessionStoreError> {
    let value = HeaderValue::from_str(&value)
        .map_err(|e| SessionStoreError::InvalidConfig(format!("bad cookie header: {}", e)))?;
    headers.append(SET_COOKIE, value);
    Ok(())
}
