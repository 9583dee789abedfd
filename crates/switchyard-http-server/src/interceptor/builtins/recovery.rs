//! Panic recovery

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use hyper::StatusCode;
use tracing::error;

use crate::interceptor::Interceptor;
use crate::{BoxedHandler, RequestContext, response};

/// Interceptor converting a panic anywhere inside it into `500 text/plain`
///
/// The response body is the panic message. Register it first so it encloses
/// every other interceptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recovery;

impl Interceptor for Recovery {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(move |ctx: RequestContext| {
            let next = Arc::clone(&next);
            async move {
                let path = ctx.path().to_string();
                match AssertUnwindSafe(next.call(ctx)).catch_unwind().await {
                    Ok(response) => response,
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        error!(path = %path, "Handler panicked: {}", message);
                        response::text(StatusCode::INTERNAL_SERVER_ERROR, message)
                    }
                }
            }
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
