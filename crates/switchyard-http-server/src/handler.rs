//! Request handler trait

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;

use crate::RequestContext;

/// Response type produced by every handler
pub type HttpResponse = Response<Full<Bytes>>;

/// Terminal request handler, or a handler chain already wrapped in interceptors
///
/// Any `Fn(RequestContext) -> impl Future<Output = HttpResponse>` is a handler:
///
/// ```rust
/// use hyper::StatusCode;
/// use switchyard_http_server::{RequestContext, response};
///
/// let hello = |_ctx: RequestContext| async { response::text(StatusCode::OK, "hello") };
/// # let _ = hello;
/// ```
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Handle one request
    async fn call(&self, ctx: RequestContext) -> HttpResponse;
}

/// Shared, type-erased handler
pub type BoxedHandler = Arc<dyn Handler>;

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    async fn call(&self, ctx: RequestContext) -> HttpResponse {
        (self)(ctx).await
    }
}
