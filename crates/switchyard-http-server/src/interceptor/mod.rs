//! Interceptor composition
//!
//! Interceptors wrap handlers. Every route's chain is composed once, at
//! registration time, and stored fully built in the route table.
//!
//! # Overview
//!
//! - [`Interceptor`] - wraps a handler into a new handler
//! - [`InterceptorStack`] - ordered global interceptors; first registered is outermost
//! - [`NamedInterceptors`] - ordered table keyed by owner qualifier or path prefix
//! - [`builtins`] - ready-made CORS and panic-recovery interceptors
//!
//! # Examples
//!
//! ```rust
//! use hyper::StatusCode;
//! use switchyard_http_server::{RequestContext, Router, interceptor_fn, response};
//!
//! let mut router = Router::new();
//! router.use_interceptor(interceptor_fn(|ctx: RequestContext, next| async move {
//!     tracing::info!("Request: {} {}", ctx.method(), ctx.path());
//!     next.call(ctx).await
//! }));
//! router.get("/health", |_ctx: RequestContext| async {
//!     response::text(StatusCode::OK, "ok")
//! });
//! ```

pub mod builtins;
pub mod named;
pub mod stack;
pub mod traits;

pub use named::NamedInterceptors;
pub use stack::{InterceptorStack, apply_filters};
pub use traits::{FnInterceptor, Interceptor, SharedInterceptor, interceptor_fn};
