//! Named interceptor table
//!
//! Associates interceptors with a logical owner (a route group's qualifier) or a
//! URL prefix instead of individual routes. The table is an ordered list so that
//! composition is deterministic when several entries match the same route.

use super::SharedInterceptor;
use crate::BoxedHandler;

/// Ordered table of `(qualifier, interceptor)` entries
///
/// An entry matches a route when its qualifier is a substring of the route's
/// owner qualifier, or a prefix of the route's full path. Empty qualifiers never
/// match. Matching entries wrap the route in table order, the first entry outermost.
#[derive(Default, Clone)]
pub struct NamedInterceptors {
    entries: Vec<(String, SharedInterceptor)>,
}

impl NamedInterceptors {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; earlier entries take priority (wrap further out)
    pub fn push(&mut self, qualifier: impl Into<String>, interceptor: SharedInterceptor) {
        self.entries.push((qualifier.into(), interceptor));
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Qualifiers of the entries that apply to a route, in table order
    pub fn matching<'a>(&'a self, owner: &'a str, path: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(qualifier, _)| Self::matches(qualifier, owner, path))
            .map(|(qualifier, _)| qualifier.as_str())
    }

    /// Wrap `handler` in every matching entry, first entry outermost
    pub fn wrap(&self, handler: BoxedHandler, owner: &str, path: &str) -> BoxedHandler {
        self.entries
            .iter()
            .rev()
            .filter(|(qualifier, _)| Self::matches(qualifier, owner, path))
            .fold(handler, |inner, (_, interceptor)| interceptor.wrap(inner))
    }

    fn matches(qualifier: &str, owner: &str, path: &str) -> bool {
        !qualifier.is_empty() && (owner.contains(qualifier) || path.starts_with(qualifier))
    }
}
