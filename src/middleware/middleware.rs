use axum::Router;

/// Wraps every route of the server in a layer.
pub trait Middleware: Send + Sync {
    fn apply(&self, router: Router) -> Router;
}
