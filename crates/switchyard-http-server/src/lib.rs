//! # Switchyard HTTP Server
//!
//! This crate provides request dispatch for HTTP services: a per-method route
//! table whose entries are handlers already wrapped in their composed interceptor
//! chains, plus cookie-bound session access through the request context.
//!
//! ## Features
//! - Five method buckets (ANY, GET, POST, PUT, DELETE) with group/prefix registration
//! - Global interceptors, per-route filters and an ordered table of named interceptors
//! - Built-in CORS and panic-recovery interceptors
//! - Static-file and pass-through fallbacks, custom not-found handler
//! - Pluggable session storage (in-memory or remote cache)
//! - Graceful shutdown with a bounded grace period

pub mod context;
pub mod handler;
pub mod interceptor;
pub mod response;
pub mod router;
pub mod server;
pub mod static_files;

#[cfg(test)]
mod tests;

// Re-export main types
pub use context::RequestContext;
pub use handler::{BoxedHandler, Handler, HttpResponse};
pub use interceptor::builtins::{Cors, Recovery};
pub use interceptor::{
    Interceptor, InterceptorStack, NamedInterceptors, SharedInterceptor, interceptor_fn,
};
pub use router::{RouteMethod, Router, Routes};
pub use server::{Server, ServerConfig};
pub use static_files::StaticFiles;

// Re-export foundational types
pub use switchyard_session_storage as session;
pub use switchyard_session_storage::{SessionHandle, SessionStore, SessionStoreError};

/// Result type for HTTP server operations
pub type Result<T> = std::result::Result<T, HttpServerError>;

/// HTTP server specific errors
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session store error: {0}")]
    Session(#[from] SessionStoreError),
}
