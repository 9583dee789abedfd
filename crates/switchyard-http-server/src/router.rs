//! Method/path request dispatcher
//!
//! Routes live in five method tables (ANY, GET, POST, PUT, DELETE). Each entry
//! is the handler already wrapped in its full interceptor chain, composed once
//! at registration time, so dispatch is a lookup plus one call.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use hyper::{Method, Request};
use switchyard_session_storage::SharedSessionStore;
use tracing::debug;

use crate::interceptor::{InterceptorStack, NamedInterceptors, SharedInterceptor, apply_filters};
use crate::{
    BoxedHandler, Handler, HttpResponse, Interceptor, RequestContext, StaticFiles, response,
};

/// Method bucket a route is registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    /// Matches any request method not claimed by a method-specific route
    Any,
    Get,
    Post,
    Put,
    Delete,
}

impl RouteMethod {
    /// Bucket order used to answer `OPTIONS` for a path
    const PREFLIGHT_ORDER: [RouteMethod; 5] = [
        RouteMethod::Any,
        RouteMethod::Get,
        RouteMethod::Post,
        RouteMethod::Put,
        RouteMethod::Delete,
    ];

    /// Method-specific bucket for an HTTP method, if there is one
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(RouteMethod::Get),
            Method::POST => Some(RouteMethod::Post),
            Method::PUT => Some(RouteMethod::Put),
            Method::DELETE => Some(RouteMethod::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMethod::Any => "ANY",
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
            RouteMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A group of routes that registers itself under a mount prefix
///
/// The qualifier names the group for named-interceptor matching. It defaults
/// to the implementing type's name.
///
/// # Examples
///
/// ```rust
/// use hyper::StatusCode;
/// use switchyard_http_server::{RequestContext, Router, Routes, response};
///
/// struct AccountRoutes;
///
/// impl Routes for AccountRoutes {
///     fn routes(&self, router: &mut Router) {
///         router.get("/profile", |_ctx: RequestContext| async {
///             response::text(StatusCode::OK, "profile")
///         });
///     }
/// }
///
/// let mut router = Router::new();
/// router.mount("/account", &AccountRoutes);
/// assert!(router.has_route(switchyard_http_server::RouteMethod::Get, "/account/profile"));
/// ```
pub trait Routes {
    fn qualifier(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn routes(&self, router: &mut Router);
}

/// Route tables plus the interceptors and fallbacks applied at dispatch
#[derive(Default)]
pub struct Router {
    tables: HashMap<RouteMethod, HashMap<String, BoxedHandler>>,
    interceptors: InterceptorStack,
    named: NamedInterceptors,
    // Registration-time registers, restored when a group returns
    prefix: String,
    owner: String,
    static_handlers: Vec<(String, BoxedHandler)>,
    passthrough: Vec<(String, BoxedHandler)>,
    not_found: Option<BoxedHandler>,
    session_store: Option<SharedSessionStore>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================================================
    // Interceptors
    // ============================================================================

    /// Add a global interceptor
    ///
    /// Applies to routes registered after this call. Global interceptors nest in
    /// registration order, the first one outermost.
    pub fn use_interceptor<I: Interceptor>(&mut self, interceptor: I) -> &mut Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Add an interceptor for routes whose owner qualifier contains `qualifier`
    /// or whose full path starts with it
    ///
    /// Applies to routes registered after this call, outside the global interceptors.
    pub fn intercept_named<I: Interceptor>(
        &mut self,
        qualifier: impl Into<String>,
        interceptor: I,
    ) -> &mut Self {
        self.named.push(qualifier, Arc::new(interceptor));
        self
    }

    // ============================================================================
    // Route registration
    // ============================================================================

    /// Register `handler` under `method` at the current prefix plus `path`
    ///
    /// The stored chain is, from the inside out: the handler, `filters` (the last
    /// one outermost), the global interceptors, then every matching named interceptor.
    pub fn handle<H: Handler>(
        &mut self,
        method: RouteMethod,
        path: &str,
        filters: &[SharedInterceptor],
        handler: H,
    ) -> &mut Self {
        let full_path = format!("{}{}", self.prefix, path);

        let chain = apply_filters(Arc::new(handler), filters);
        let chain = self.interceptors.wrap(chain);
        let chain = self.named.wrap(chain, &self.owner, &full_path);

        debug!(
            method = %method,
            owner = %self.owner,
            filters = filters.len(),
            "Registered route: {}",
            full_path
        );
        self.tables
            .entry(method)
            .or_default()
            .insert(full_path, chain);
        self
    }

    pub fn get<H: Handler>(&mut self, path: &str, handler: H) -> &mut Self {
        self.handle(RouteMethod::Get, path, &[], handler)
    }

    pub fn post<H: Handler>(&mut self, path: &str, handler: H) -> &mut Self {
        self.handle(RouteMethod::Post, path, &[], handler)
    }

    pub fn put<H: Handler>(&mut self, path: &str, handler: H) -> &mut Self {
        self.handle(RouteMethod::Put, path, &[], handler)
    }

    pub fn delete<H: Handler>(&mut self, path: &str, handler: H) -> &mut Self {
        self.handle(RouteMethod::Delete, path, &[], handler)
    }

    pub fn any<H: Handler>(&mut self, path: &str, handler: H) -> &mut Self {
        self.handle(RouteMethod::Any, path, &[], handler)
    }

    pub fn get_with<H: Handler>(
        &mut self,
        path: &str,
        filters: &[SharedInterceptor],
        handler: H,
    ) -> &mut Self {
        self.handle(RouteMethod::Get, path, filters, handler)
    }

    pub fn post_with<H: Handler>(
        &mut self,
        path: &str,
        filters: &[SharedInterceptor],
        handler: H,
    ) -> &mut Self {
        self.handle(RouteMethod::Post, path, filters, handler)
    }

    pub fn put_with<H: Handler>(
        &mut self,
        path: &str,
        filters: &[SharedInterceptor],
        handler: H,
    ) -> &mut Self {
        self.handle(RouteMethod::Put, path, filters, handler)
    }

    pub fn delete_with<H: Handler>(
        &mut self,
        path: &str,
        filters: &[SharedInterceptor],
        handler: H,
    ) -> &mut Self {
        self.handle(RouteMethod::Delete, path, filters, handler)
    }

    pub fn any_with<H: Handler>(
        &mut self,
        path: &str,
        filters: &[SharedInterceptor],
        handler: H,
    ) -> &mut Self {
        self.handle(RouteMethod::Any, path, filters, handler)
    }

    /// Register the routes added by `f` under `prefix` (groups nest)
    pub fn group(&mut self, prefix: &str, f: impl FnOnce(&mut Router)) -> &mut Self {
        let previous = self.prefix.clone();
        self.prefix.push_str(prefix);
        f(self);
        self.prefix = previous;
        self
    }

    /// Like [`Router::group`], with `owner` as the qualifier for named interceptors
    pub fn group_owned(
        &mut self,
        prefix: &str,
        owner: &str,
        f: impl FnOnce(&mut Router),
    ) -> &mut Self {
        let previous = std::mem::replace(&mut self.owner, owner.to_string());
        self.group(prefix, f);
        self.owner = previous;
        self
    }

    /// Let `routes` register itself under `prefix`, owned by its qualifier
    pub fn mount<R: Routes + ?Sized>(&mut self, prefix: &str, routes: &R) -> &mut Self {
        let owner = routes.qualifier().to_string();
        self.group_owned(prefix, &owner, |router| routes.routes(router))
    }

    // ============================================================================
    // Fallbacks and sessions
    // ============================================================================

    /// Serve files from `root` for paths under `url_prefix`
    pub fn static_files(&mut self, url_prefix: &str, root: impl Into<PathBuf>) -> &mut Self {
        let handler = StaticFiles::new(url_prefix, root);
        self.static_handler(url_prefix, handler)
    }

    /// Handler for paths under `url_prefix`, tried before the route tables for
    /// paths containing a `.` and again after pass-through handlers
    pub fn static_handler<H: Handler>(&mut self, url_prefix: &str, handler: H) -> &mut Self {
        debug!("Registered static handler: {}", url_prefix);
        self.static_handlers
            .push((url_prefix.to_string(), Arc::new(handler)));
        self
    }

    /// Handler for any path under `url_prefix` that no route matched
    pub fn passthrough<H: Handler>(&mut self, url_prefix: &str, handler: H) -> &mut Self {
        debug!("Registered pass-through handler: {}", url_prefix);
        self.passthrough
            .push((url_prefix.to_string(), Arc::new(handler)));
        self
    }

    /// Handler for requests nothing else matched, replacing the default 400
    pub fn not_found<H: Handler>(&mut self, handler: H) -> &mut Self {
        self.not_found = Some(Arc::new(handler));
        self
    }

    /// Enable cookie sessions for every request
    pub fn session_store(&mut self, store: SharedSessionStore) -> &mut Self {
        self.session_store = Some(store);
        self
    }

    pub fn sessions(&self) -> Option<&SharedSessionStore> {
        self.session_store.as_ref()
    }

    // ============================================================================
    // Dispatch
    // ============================================================================

    pub fn has_route(&self, method: RouteMethod, path: &str) -> bool {
        self.lookup(method, path).is_some()
    }

    /// All registered `(method, path)` pairs, sorted
    pub fn registered_routes(&self) -> Vec<(RouteMethod, String)> {
        let mut routes: Vec<(RouteMethod, String)> = self
            .tables
            .iter()
            .flat_map(|(method, table)| table.keys().map(|path| (*method, path.clone())))
            .collect();
        routes.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        routes
    }

    /// Route one buffered request to its handler chain
    ///
    /// Headers queued on the context (session cookies) are appended to whatever
    /// response the chain produces.
    pub async fn dispatch(&self, request: Request<Bytes>) -> HttpResponse {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let mut ctx = RequestContext::new(request);
        if let Some(store) = &self.session_store {
            ctx = ctx.with_session_store(Arc::clone(store));
        }
        let pending = ctx.response_surface();

        let mut response = match self.resolve(&method, &path) {
            Some(handler) => handler.call(ctx).await,
            None => {
                debug!(method = %method, "No route for {}", path);
                response::unmatched(&path)
            }
        };

        let pending = std::mem::take(&mut *pending.lock());
        let headers = response.headers_mut();
        for (name, value) in pending.iter() {
            headers.append(name.clone(), value.clone());
        }
        response
    }

    fn resolve(&self, method: &Method, path: &str) -> Option<&BoxedHandler> {
        if path.contains('.')
            && let Some(handler) = longest_prefix(&self.static_handlers, path)
        {
            return Some(handler);
        }

        let routed = if *method == Method::OPTIONS {
            RouteMethod::PREFLIGHT_ORDER
                .iter()
                .find_map(|bucket| self.lookup(*bucket, path))
        } else {
            RouteMethod::from_method(method)
                .and_then(|bucket| self.lookup(bucket, path))
                .or_else(|| self.lookup(RouteMethod::Any, path))
        };

        routed
            .or_else(|| longest_prefix(&self.passthrough, path))
            .or_else(|| longest_prefix(&self.static_handlers, path))
            .or(self.not_found.as_ref())
    }

    fn lookup(&self, method: RouteMethod, path: &str) -> Option<&BoxedHandler> {
        self.tables.get(&method).and_then(|table| table.get(path))
    }
}

fn longest_prefix<'a>(
    handlers: &'a [(String, BoxedHandler)],
    path: &str,
) -> Option<&'a BoxedHandler> {
    handlers
        .iter()
        .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, handler)| handler)
}
