//! CORS (Cross-Origin Resource Sharing) support

use std::sync::Arc;

use hyper::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, HeaderValue, InvalidHeaderValue,
};
use hyper::{HeaderMap, Method, StatusCode};

use crate::interceptor::Interceptor;
use crate::{BoxedHandler, RequestContext, response};

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Accept, Authorization";
const MAX_AGE: &str = "86400";

/// Interceptor adding CORS headers to every response
///
/// `OPTIONS` requests are answered with `200` without reaching the inner chain.
#[derive(Debug, Clone, Default)]
pub struct Cors {
    origin: Option<HeaderValue>,
}

impl Cors {
    /// Allow any origin (`*`)
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow a single origin, with credentials
    pub fn for_origin(origin: &str) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            origin: Some(HeaderValue::from_str(origin)?),
        })
    }

    /// Apply CORS headers to a response
    pub fn apply_cors_headers(&self, headers: &mut HeaderMap) {
        match &self.origin {
            Some(origin) => {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
                headers.insert(
                    ACCESS_CONTROL_ALLOW_CREDENTIALS,
                    HeaderValue::from_static("true"),
                );
            }
            None => {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
            }
        }
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE));
    }
}

impl Interceptor for Cors {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        let cors = self.clone();
        Arc::new(move |ctx: RequestContext| {
            let cors = cors.clone();
            let next = Arc::clone(&next);
            async move {
                let mut response = if ctx.method() == Method::OPTIONS {
                    response::empty(StatusCode::OK)
                } else {
                    next.call(ctx).await
                };
                cors.apply_cors_headers(response.headers_mut());
                response
            }
        })
    }
}
