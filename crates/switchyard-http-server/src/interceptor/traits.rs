//! Core interceptor trait definitions

use std::future::Future;
use std::sync::Arc;

use crate::{BoxedHandler, HttpResponse, RequestContext};

/// Wraps a handler into a new handler
///
/// An interceptor sees the request before the wrapped handler and the response
/// after it. It may also answer on its own without calling the inner handler.
/// Wrapping happens once per route when the route is registered, never per request.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use hyper::StatusCode;
/// use switchyard_http_server::{BoxedHandler, Interceptor, RequestContext, response};
///
/// struct RequireHeader(&'static str);
///
/// impl Interceptor for RequireHeader {
///     fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
///         let header = self.0;
///         Arc::new(move |ctx: RequestContext| {
///             let next = Arc::clone(&next);
///             async move {
///                 if ctx.headers().contains_key(header) {
///                     next.call(ctx).await
///                 } else {
///                     response::text(StatusCode::UNAUTHORIZED, "missing credentials")
///                 }
///             }
///         })
///     }
/// }
/// ```
pub trait Interceptor: Send + Sync + 'static {
    /// Produce a handler that runs this interceptor around `next`
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

/// Shared, type-erased interceptor
pub type SharedInterceptor = Arc<dyn Interceptor>;

impl<I: Interceptor + ?Sized> Interceptor for Arc<I> {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        (**self).wrap(next)
    }
}

/// Interceptor built from an async closure receiving the request and the next handler
pub struct FnInterceptor<F> {
    f: Arc<F>,
}

/// Build an interceptor from `|ctx, next| async move { ... }`
pub fn interceptor_fn<F, Fut>(f: F) -> FnInterceptor<F>
where
    F: Fn(RequestContext, BoxedHandler) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    FnInterceptor { f: Arc::new(f) }
}

impl<F, Fut> Interceptor for FnInterceptor<F>
where
    F: Fn(RequestContext, BoxedHandler) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        let f = Arc::clone(&self.f);
        Arc::new(move |ctx: RequestContext| (f)(ctx, Arc::clone(&next)))
    }
}
