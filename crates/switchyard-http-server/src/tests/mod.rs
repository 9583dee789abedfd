//! Test modules for switchyard-http-server crate
//!
//! Dispatch, interceptor composition, session binding and the live server loop.

mod router_tests;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{Method, Request};

use crate::HttpResponse;

/// Build a bodiless request
pub(crate) fn request(method: Method, path: &str) -> Request<Bytes> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Bytes::new())
        .unwrap()
}

/// Collect a response body as UTF-8
pub(crate) async fn body_string(response: HttpResponse) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
