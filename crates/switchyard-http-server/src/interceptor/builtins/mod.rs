//! Built-in interceptors
//!
//! - **Cors**: cross-origin headers on every response, preflight answered directly
//! - **Recovery**: turns a panicking handler into a `500` response
//!
//! # Examples
//!
//! ```rust
//! use switchyard_http_server::{Cors, Recovery, Router};
//!
//! let mut router = Router::new();
//! router.use_interceptor(Recovery);
//! router.use_interceptor(Cors::new());
//! ```

mod cors;
mod recovery;

pub use cors::Cors;
pub use recovery::Recovery;
