// Route registration seam of the HTTP server.

use axum::Router;

/// Adds one group of routes to the server's router.
///
/// ```rust
/// # use axum::{Router, routing::get};
/// # async fn handler() -> &'static str { "" }
/// let router: Router<()> = Router::new().route("/", get(handler));
/// # let _ = router;
/// ```
pub trait Controller: Send + Sync {
    fn add_route(&self, router: Router) -> Router;
}
