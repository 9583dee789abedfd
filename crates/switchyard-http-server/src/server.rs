//! HTTP server running a [`Router`]
//!
//! Accepts connections on a background task, serves each one on its own task,
//! and shuts down gracefully: stop accepting, let in-flight requests finish
//! within the grace period, then stop the session store's background work.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use switchyard_session_storage::SessionStore;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{HttpResponse, Result, Router, response};

/// Configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Maximum request body size in bytes; larger bodies get `413`
    pub max_body_size: usize,
    /// How long in-flight connections may run after shutdown starts
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8000)),
            max_body_size: 1024 * 1024, // 1MB
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// HTTP/1 server dispatching every request through a [`Router`]
pub struct Server {
    config: ServerConfig,
    router: Arc<Router>,
}

impl Server {
    /// Create a server with the default configuration
    pub fn new(router: Router) -> Self {
        Self {
            config: ServerConfig::default(),
            router: Arc::new(router),
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Set the graceful shutdown period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace = grace;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", err);
            }
        })
        .await
    }

    /// Bind the configured address and serve until `shutdown` completes
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind(self.config.bind_address).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve connections from an already bound listener until `shutdown` completes
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        info!("HTTP server listening on {}", listener.local_addr()?);
        if let Some(store) = self.router.sessions() {
            info!("Session storage: {}", store.backend_name());
            store.start();
        }

        let token = CancellationToken::new();
        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.router),
            self.config.max_body_size,
            token.clone(),
        ));

        shutdown.await;
        info!("Shutdown requested, no longer accepting connections");
        token.cancel();

        match accept_task.await {
            Ok(graceful) => {
                if tokio::time::timeout(self.config.shutdown_grace, graceful.shutdown())
                    .await
                    .is_err()
                {
                    warn!(
                        "Connections still open after {:?}, shutting down anyway",
                        self.config.shutdown_grace
                    );
                }
            }
            Err(err) => error!("Accept loop failed: {}", err),
        }

        if let Some(store) = self.router.sessions() {
            store.close();
        }
        info!("HTTP server stopped");
        Ok(())
    }
}

async fn accept_loop(
    listener: TcpListener,
    router: Arc<Router>,
    max_body_size: usize,
    token: CancellationToken,
) -> GracefulShutdown {
    let graceful = GracefulShutdown::new();
    loop {
        let (stream, peer_addr) = tokio::select! {
            _ = token.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    error!("Failed to accept connection: {}", err);
                    continue;
                }
            },
        };
        debug!("New connection from {}", peer_addr);

        let router = Arc::clone(&router);
        let service =
            service_fn(move |req| handle_request(req, Arc::clone(&router), max_body_size));
        let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        let connection = graceful.watch(connection);

        tokio::spawn(async move {
            if let Err(err) = connection.await {
                // Clients hanging up mid-request are routine
                if err.is_incomplete_message() {
                    debug!("Client disconnected: {}", err);
                } else {
                    error!("Error serving connection: {}", err);
                }
            }
        });
    }
    graceful
}

async fn handle_request(
    req: Request<Incoming>,
    router: Arc<Router>,
    max_body_size: usize,
) -> std::result::Result<HttpResponse, Infallible> {
    let (parts, body) = req.into_parts();
    debug!("Handling {} {}", parts.method, parts.uri.path());

    let body = match Limited::new(body, max_body_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            warn!("Request body exceeds {} bytes", max_body_size);
            return Ok(response::text(
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body too large",
            ));
        }
        Err(err) => {
            debug!("Failed to read request body: {}", err);
            return Ok(response::text(
                StatusCode::BAD_REQUEST,
                "failed to read request body",
            ));
        }
    };

    Ok(router.dispatch(Request::from_parts(parts, body)).await)
}
