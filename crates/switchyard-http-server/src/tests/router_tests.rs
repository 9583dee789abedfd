//! Dispatch and interceptor composition through the public `Router` API

use std::sync::{Arc, Mutex};

use hyper::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use hyper::{Method, StatusCode};

use super::{body_string, request};
use crate::{
    BoxedHandler, Cors, Handler, HttpResponse, Interceptor, Recovery, RequestContext,
    RouteMethod, Router, Routes, SharedInterceptor, interceptor_fn, response,
};

type Log = Arc<Mutex<Vec<&'static str>>>;

fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn reply(body: &'static str) -> impl Handler {
    move |_ctx: RequestContext| async move { response::text(StatusCode::OK, body) }
}

/// Interceptor that records `id` before calling the rest of the chain
fn marker(id: &'static str, log: &Log) -> impl Interceptor + use<> {
    let log = Arc::clone(log);
    interceptor_fn(move |ctx: RequestContext, next: BoxedHandler| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(id);
            next.call(ctx).await
        }
    })
}

fn terminal(log: &Log) -> impl Handler + use<> {
    let log = Arc::clone(log);
    move |_ctx: RequestContext| {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push("H");
            response::text(StatusCode::OK, "H")
        }
    }
}

async fn exploding(_ctx: RequestContext) -> HttpResponse {
    panic!("handler exploded")
}

#[tokio::test]
async fn test_method_isolation() {
    let mut router = Router::new();
    router.get("/x", reply("get"));
    router.post("/x", reply("post"));

    let response = router.dispatch(request(Method::GET, "/x")).await;
    assert_eq!(body_string(response).await, "get");

    let response = router.dispatch(request(Method::POST, "/x")).await;
    assert_eq!(body_string(response).await, "post");

    let response = router.dispatch(request(Method::PUT, "/x")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_interceptor_then_filter_ordering() {
    let log = new_log();
    let mut router = Router::new();
    router.use_interceptor(marker("A", &log));
    router.use_interceptor(marker("B", &log));
    router.use_interceptor(marker("C", &log));
    let filter: SharedInterceptor = Arc::new(marker("D", &log));
    router.get_with("/ordered", &[filter], terminal(&log));

    let response = router.dispatch(request(Method::GET, "/ordered")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(*log.lock().unwrap(), vec!["A", "B", "C", "D", "H"]);
}

#[tokio::test]
async fn test_rightmost_filter_outermost() {
    let log = new_log();
    let mut router = Router::new();
    let filters: Vec<SharedInterceptor> =
        vec![Arc::new(marker("D", &log)), Arc::new(marker("E", &log))];
    router.post_with("/filtered", &filters, terminal(&log));

    router.dispatch(request(Method::POST, "/filtered")).await;
    assert_eq!(*log.lock().unwrap(), vec!["E", "D", "H"]);
}

#[tokio::test]
async fn test_interceptors_apply_to_later_routes_only() {
    let log = new_log();
    let mut router = Router::new();
    router.get("/early", terminal(&log));
    router.use_interceptor(marker("A", &log));
    router.get("/late", terminal(&log));

    router.dispatch(request(Method::GET, "/early")).await;
    assert_eq!(*log.lock().unwrap(), vec!["H"]);

    log.lock().unwrap().clear();
    router.dispatch(request(Method::GET, "/late")).await;
    assert_eq!(*log.lock().unwrap(), vec!["A", "H"]);
}

#[tokio::test]
async fn test_group_prefixing() {
    let mut router = Router::new();
    router.group("/api", |api| {
        api.get("/x", reply("x"));
        api.group("/v1", |v1| {
            v1.get("/y", reply("y"));
        });
    });
    router.get("/z", reply("z"));

    let response = router.dispatch(request(Method::GET, "/api/x")).await;
    assert_eq!(body_string(response).await, "x");

    let response = router.dispatch(request(Method::GET, "/api/v1/y")).await;
    assert_eq!(body_string(response).await, "y");

    // Prefix register is restored once a group returns
    let response = router.dispatch(request(Method::GET, "/z")).await;
    assert_eq!(body_string(response).await, "z");

    let response = router.dispatch(request(Method::GET, "/x")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unmatched_path_is_400() {
    let mut router = Router::new();
    router.get("/known", reply("known"));

    let response = router.dispatch(request(Method::GET, "/zzz")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("/zzz"));
    assert_eq!(body, "error URL:/zzz");
}

#[tokio::test]
async fn test_any_is_fallback_bucket() {
    let mut router = Router::new();
    router.any("/hook", reply("any"));
    router.get("/hook", reply("get"));

    let response = router.dispatch(request(Method::GET, "/hook")).await;
    assert_eq!(body_string(response).await, "get");

    for method in [Method::POST, Method::PUT, Method::DELETE, Method::PATCH] {
        let response = router.dispatch(request(method, "/hook")).await;
        assert_eq!(body_string(response).await, "any");
    }
}

#[tokio::test]
async fn test_named_interceptor_by_path_prefix() {
    let log = new_log();
    let mut router = Router::new();
    router.use_interceptor(marker("A", &log));
    router.intercept_named("/admin", marker("N", &log));
    router.get("/admin/users", terminal(&log));
    router.get("/public", terminal(&log));

    router.dispatch(request(Method::GET, "/admin/users")).await;
    assert_eq!(*log.lock().unwrap(), vec!["N", "A", "H"]);

    log.lock().unwrap().clear();
    router.dispatch(request(Method::GET, "/public")).await;
    assert_eq!(*log.lock().unwrap(), vec!["A", "H"]);
}

#[tokio::test]
async fn test_multiple_named_matches_in_table_order() {
    let log = new_log();
    let mut router = Router::new();
    router.intercept_named("/api", marker("X", &log));
    router.intercept_named("Billing", marker("Y", &log));
    router.group_owned("/api", "app::Billing", |api| {
        api.get("/invoices", terminal(&log));
    });

    router.dispatch(request(Method::GET, "/api/invoices")).await;
    assert_eq!(*log.lock().unwrap(), vec!["X", "Y", "H"]);
}

struct AccountRoutes {
    log: Log,
}

impl Routes for AccountRoutes {
    fn routes(&self, router: &mut Router) {
        router.get("/me", terminal(&self.log));
    }
}

struct Renamed;

impl Routes for Renamed {
    fn qualifier(&self) -> &str {
        "reports"
    }

    fn routes(&self, router: &mut Router) {
        router.get("/daily", reply("daily"));
    }
}

#[tokio::test]
async fn test_mount_uses_type_name_qualifier() {
    let log = new_log();
    let mut router = Router::new();
    router.intercept_named("AccountRoutes", marker("Q", &log));
    router.mount("/account", &AccountRoutes { log: Arc::clone(&log) });
    router.get("/other", terminal(&log));

    router.dispatch(request(Method::GET, "/account/me")).await;
    assert_eq!(*log.lock().unwrap(), vec!["Q", "H"]);

    // Owner register is restored after mount
    log.lock().unwrap().clear();
    router.dispatch(request(Method::GET, "/other")).await;
    assert_eq!(*log.lock().unwrap(), vec!["H"]);
}

#[tokio::test]
async fn test_mount_with_explicit_qualifier() {
    let log = new_log();
    let mut router = Router::new();
    router.intercept_named("reports", marker("R", &log));
    router.mount("/r", &Renamed);

    let response = router.dispatch(request(Method::GET, "/r/daily")).await;
    assert_eq!(body_string(response).await, "daily");
    assert_eq!(*log.lock().unwrap(), vec!["R"]);
    assert!(router.has_route(RouteMethod::Get, "/r/daily"));
}

#[tokio::test]
async fn test_passthrough_longest_prefix() {
    let mut router = Router::new();
    router.passthrough("/proxy", reply("short"));
    router.passthrough("/proxy/api", reply("long"));
    router.get("/proxy/exact", reply("route"));

    let response = router.dispatch(request(Method::GET, "/proxy/api/users")).await;
    assert_eq!(body_string(response).await, "long");

    let response = router.dispatch(request(Method::DELETE, "/proxy/other")).await;
    assert_eq!(body_string(response).await, "short");

    let response = router.dispatch(request(Method::GET, "/proxy/exact")).await;
    assert_eq!(body_string(response).await, "route");
}

#[tokio::test]
async fn test_static_files_served_for_dotted_paths() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();

    let mut router = Router::new();
    router.static_files("/assets", dir.path());
    router.get("/assets/app.js", reply("route"));

    // Dotted paths try static handlers before the route tables
    let response = router.dispatch(request(Method::GET, "/assets/app.js")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "console.log(1)");

    // Undotted paths under the prefix reach static handlers after the tables miss
    let response = router.dispatch(request(Method::GET, "/assets/missing")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dotted_route_without_static_handlers() {
    let mut router = Router::new();
    router.get("/export.csv", reply("a,b"));

    let response = router.dispatch(request(Method::GET, "/export.csv")).await;
    assert_eq!(body_string(response).await, "a,b");
}

#[tokio::test]
async fn test_custom_not_found() {
    let mut router = Router::new();
    router.not_found(|ctx: RequestContext| async move {
        response::text(StatusCode::NOT_FOUND, format!("nothing at {}", ctx.path()))
    });

    let response = router.dispatch(request(Method::GET, "/missing")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "nothing at /missing");
}

#[tokio::test]
async fn test_cors_answers_preflight() {
    let log = new_log();
    let mut router = Router::new();
    router.use_interceptor(Cors::new());
    router.post("/submit", terminal(&log));

    let response = router.dispatch(request(Method::OPTIONS, "/submit")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
    assert!(log.lock().unwrap().is_empty());

    let response = router.dispatch(request(Method::POST, "/submit")).await;
    assert!(response.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
    assert_eq!(*log.lock().unwrap(), vec!["H"]);

    let response = router.dispatch(request(Method::OPTIONS, "/unknown")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recovery_turns_panic_into_500() {
    let mut router = Router::new();
    router.use_interceptor(Recovery);
    router.get("/explode", exploding);
    router.get("/fine", reply("fine"));

    let response = router.dispatch(request(Method::GET, "/explode")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(response).await, "handler exploded");

    let response = router.dispatch(request(Method::GET, "/fine")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn test_registered_routes() {
    let mut router = Router::new();
    router.delete("/b", reply("b"));
    router.put("/a", reply("a"));
    router.any("/a", reply("a"));

    assert_eq!(
        router.registered_routes(),
        vec![
            (RouteMethod::Any, "/a".to_string()),
            (RouteMethod::Put, "/a".to_string()),
            (RouteMethod::Delete, "/b".to_string()),
        ]
    );
}
