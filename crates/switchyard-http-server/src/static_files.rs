//! Static file handler

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use hyper::StatusCode;
use percent_encoding::percent_decode_str;
use tracing::{debug, warn};

use crate::{Handler, HttpResponse, RequestContext, response};

/// Serves files below `root` for request paths under `url_prefix`
///
/// Directory requests fall back to `index.html`. Paths containing `..` are
/// rejected with `404` so nothing outside `root` can be reached.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    url_prefix: String,
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(url_prefix: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            url_prefix: url_prefix.into(),
            root: root.into(),
        }
    }

    /// Resolve a request path to a file under the root
    fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let relative = request_path
            .strip_prefix(self.url_prefix.as_str())
            .unwrap_or(request_path)
            .trim_start_matches('/');
        let relative = percent_decode_str(relative).decode_utf8().ok()?;
        let relative = Path::new(&*relative);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl Handler for StaticFiles {
    async fn call(&self, ctx: RequestContext) -> HttpResponse {
        let Some(mut path) = self.resolve(ctx.path()) else {
            debug!("Rejected static path: {}", ctx.path());
            return response::empty(StatusCode::NOT_FOUND);
        };
        if tokio::fs::metadata(&path)
            .await
            .is_ok_and(|metadata| metadata.is_dir())
        {
            path.push("index.html");
        }

        match tokio::fs::read(&path).await {
            Ok(contents) => {
                let mut response = response::empty(StatusCode::OK);
                *response.body_mut() = http_body_util::Full::new(Bytes::from(contents));
                response.headers_mut().insert(
                    hyper::header::CONTENT_TYPE,
                    hyper::header::HeaderValue::from_static(content_type(&path)),
                );
                response
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                response::empty(StatusCode::NOT_FOUND)
            }
            Err(err) => {
                warn!("Failed to read static file {}: {}", path.display(), err);
                response::empty(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}
