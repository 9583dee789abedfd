//! Interceptor stack composition

use super::SharedInterceptor;
use crate::BoxedHandler;

/// Ordered collection of global interceptors
///
/// Interceptors nest in registration order: the first one pushed is the
/// outermost layer, so it sees the request first and the response last.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use switchyard_http_server::{InterceptorStack, Recovery, Cors};
///
/// let mut stack = InterceptorStack::new();
/// stack.push(Arc::new(Recovery));
/// stack.push(Arc::new(Cors::new()));
///
/// assert_eq!(stack.len(), 2);
/// ```
#[derive(Default, Clone)]
pub struct InterceptorStack {
    interceptors: Vec<SharedInterceptor>,
}

impl InterceptorStack {
    /// Create an empty interceptor stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an interceptor inside every interceptor already in the stack
    pub fn push(&mut self, interceptor: SharedInterceptor) {
        self.interceptors.push(interceptor);
    }

    /// Get the number of interceptors in the stack
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Check if the stack is empty
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Wrap `handler` in every interceptor, first registered outermost
    pub fn wrap(&self, handler: BoxedHandler) -> BoxedHandler {
        self.interceptors
            .iter()
            .rev()
            .fold(handler, |inner, interceptor| interceptor.wrap(inner))
    }
}

/// Wrap `handler` in per-route filters, applied in the order given
///
/// Each filter wraps the result of the previous one, so the rightmost filter
/// ends up outermost of the group.
pub fn apply_filters(handler: BoxedHandler, filters: &[SharedInterceptor]) -> BoxedHandler {
    filters
        .iter()
        .fold(handler, |inner, filter| filter.wrap(inner))
}
