//! Turns handler panics into 500 problem documents.

use axum::response::{IntoResponse, Response};
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::error;

use crate::controller::ApiError;

static PANICS_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Panics recovered since start.
pub fn panics_counter() -> u64 {
    PANICS_COUNTER.load(Ordering::Relaxed)
}

fn inc_panics() {
    PANICS_COUNTER.fetch_add(1, Ordering::Relaxed);
    crate::metrics::inc_panics();
}

fn recover(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    inc_panics();
    error!(
        component = "http",
        event = "panic_recovered",
        panic = message,
        "handler panicked"
    );
    ApiError::internal("internal error").into_response()
}

#[derive(Clone, Default)]
pub struct PanicRecoverMiddleware;

impl PanicRecoverMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl super::Middleware for PanicRecoverMiddleware {
    fn apply(&self, router: axum::Router) -> axum::Router {
        router.layer(CatchPanicLayer::custom(recover))
    }
}
