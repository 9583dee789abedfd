//! Minimal response constructors used by the dispatcher and built-in interceptors

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_TYPE, HeaderValue, LOCATION};
use hyper::{Response, StatusCode};
use serde_json::{Value, json};

use crate::HttpResponse;

/// Plain-text response with the given status
pub fn text(status: StatusCode, body: impl Into<Bytes>) -> HttpResponse {
    with_content_type(status, body.into(), "text/plain; charset=utf-8")
}

/// HTML response with the given status
pub fn html(status: StatusCode, body: impl Into<Bytes>) -> HttpResponse {
    with_content_type(status, body.into(), "text/html; charset=utf-8")
}

/// JSON response with the given status
pub fn json(status: StatusCode, body: &Value) -> HttpResponse {
    // Serializing a `Value` cannot fail
    let bytes = serde_json::to_vec(body).unwrap_or_default();
    with_content_type(status, Bytes::from(bytes), "application/json")
}

/// JSON status envelope: `{"code": <code>, "msg": <msg>}` with HTTP 200
pub fn message(code: u16, msg: &str) -> HttpResponse {
    json(StatusCode::OK, &json!({ "code": code, "msg": msg }))
}

/// `302 Found` pointing at `location`
pub fn redirect(location: &str) -> HttpResponse {
    let mut response = empty(StatusCode::FOUND);
    match HeaderValue::from_str(location) {
        Ok(value) => {
            response.headers_mut().insert(LOCATION, value);
            response
        }
        Err(_) => text(StatusCode::INTERNAL_SERVER_ERROR, "invalid redirect location"),
    }
}

fn with_content_type(status: StatusCode, body: Bytes, content_type: &'static str) -> HttpResponse {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Empty response with the given status
pub fn empty(status: StatusCode) -> HttpResponse {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

/// Fixed 400 response naming the unmatched path
pub fn unmatched(path: &str) -> HttpResponse {
    text(StatusCode::BAD_REQUEST, format!("error URL:{}", path))
}
