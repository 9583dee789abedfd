//! # Minimal Server
//!
//! Cookie sessions, CORS, panic recovery and a guarded admin area behind one router.
//!
//! ```text
//! SWITCHYARD_BIND=127.0.0.1:8000            # listen address
//! SWITCHYARD_REDIS_URL=redis://127.0.0.1/   # use Redis instead of in-memory sessions
//! RUST_LOG=debug                             # see route registration and dispatch
//! ```
//!
//! Try it:
//!
//! ```text
//! curl -c jar -b jar 'http://127.0.0.1:8000/login?user=ada'
//! curl -c jar -b jar http://127.0.0.1:8000/api/whoami
//! curl -c jar -b jar http://127.0.0.1:8000/admin/stats
//! curl -c jar -b jar http://127.0.0.1:8000/logout
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::StatusCode;
use serde_json::json;
use switchyard_http_server::session::{
    RemoteCacheConfig, SessionConfig, SharedSessionStore, create_memory_store, create_redis_store,
};
use switchyard_http_server::{
    BoxedHandler, Cors, HttpResponse, Recovery, RequestContext, Router, Routes, Server,
    interceptor_fn, response,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct AdminRoutes;

impl Routes for AdminRoutes {
    fn routes(&self, router: &mut Router) {
        router.get("/stats", admin_stats);
    }
}

async fn login(ctx: RequestContext) -> HttpResponse {
    let user = ctx.form_value("user", "guest");
    match ctx.set_session_value("user", json!(user)).await {
        Ok(_) => response::message(200, &format!("welcome {}", user)),
        Err(err) => response::message(503, &err.to_string()),
    }
}

async fn logout(ctx: RequestContext) -> HttpResponse {
    match ctx.end_session().await {
        Ok(()) => response::redirect("/"),
        Err(err) => response::message(503, &err.to_string()),
    }
}

async fn whoami(ctx: RequestContext) -> HttpResponse {
    let user = ctx.local("user").cloned().unwrap_or(json!(null));
    response::json(StatusCode::OK, &json!({ "user": user }))
}

async fn admin_stats(ctx: RequestContext) -> HttpResponse {
    let visits = match ctx.session().await {
        Ok(Some(session)) => {
            let visits = session
                .get("admin_visits")
                .await
                .ok()
                .flatten()
                .and_then(|value| value.as_u64())
                .unwrap_or(0)
                + 1;
            match session.set("admin_visits", json!(visits)).await {
                Ok(true) => {}
                Ok(false) => warn!(
                    session = session.session_id(),
                    "Session vanished before the visit count was saved"
                ),
                Err(err) => warn!(
                    session = session.session_id(),
                    "Failed to save visit count: {}",
                    err
                ),
            }
            visits
        }
        _ => 0,
    };
    response::json(StatusCode::OK, &json!({ "admin_visits": visits }))
}

async fn index(_ctx: RequestContext) -> HttpResponse {
    response::html(StatusCode::OK, "<h1>switchyard</h1><a href=\"/login?user=ada\">log in</a>")
}

async fn session_store() -> anyhow::Result<SharedSessionStore> {
    let config = SessionConfig::new("switchyard_session").max_lifetime_secs(1800);
    match std::env::var("SWITCHYARD_REDIS_URL") {
        Ok(url) => {
            let remote = RemoteCacheConfig::default().url(url);
            Ok(Arc::new(create_redis_store(config, remote).await?))
        }
        Err(_) => Ok(Arc::new(create_memory_store(config))),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let bind: SocketAddr = std::env::var("SWITCHYARD_BIND")
        .unwrap_or_else(|_| "127.0.0.1:8000".to_string())
        .parse()?;

    let mut router = Router::new();
    router.session_store(session_store().await?);
    router.use_interceptor(Recovery);
    router.use_interceptor(Cors::new());

    // Loads the session user into a request local for every /api route
    router.intercept_named(
        "/api",
        interceptor_fn(|mut ctx: RequestContext, next: BoxedHandler| async move {
            if let Ok(Some(user)) = ctx.session_value("user").await {
                ctx.insert_local("user", user);
            }
            next.call(ctx).await
        }),
    );
    // Everything mounted from AdminRoutes requires a logged-in user
    router.intercept_named(
        "AdminRoutes",
        interceptor_fn(|ctx: RequestContext, next: BoxedHandler| async move {
            match ctx.session_value("user").await {
                Ok(Some(_)) => next.call(ctx).await,
                _ => response::message(401, "login required"),
            }
        }),
    );

    router.get("/", index);
    router.get("/login", login);
    router.post("/login", login);
    router.get("/logout", logout);
    router.group("/api", |api| {
        api.get("/whoami", whoami);
    });
    router.mount("/admin", &AdminRoutes);

    info!("Registered {} routes", router.registered_routes().len());
    Server::new(router).bind_address(bind).run().await?;
    Ok(())
}
