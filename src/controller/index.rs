use axum::{http::StatusCode, routing::get, Router};

use crate::http::Controller;

/// `GET /` answers an empty 200 so load balancers see a live endpoint.
#[derive(Clone, Default)]
pub struct IndexController;

impl Controller for IndexController {
    fn add_route(&self, router: Router) -> Router {
        router.route("/", get(|| async { StatusCode::OK }))
    }
}
