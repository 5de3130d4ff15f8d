//! Site registry routes of the directory.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::http::Controller;
use crate::metrics;
use crate::model::{SiteRegistration, SiteSummary};
use crate::registry::{Registry, SiteResolver};

use super::error::ApiError;

pub const SITES_PATH: &str = "/sites";

/// `POST /sites` registers or refreshes a site, `GET /sites` lists them all.
#[derive(Clone)]
pub struct SitesController {
    registry: Arc<Registry>,
    resolver: SiteResolver,
}

impl SitesController {
    pub fn new(registry: Arc<Registry>, resolver: SiteResolver) -> Self {
        Self { registry, resolver }
    }

    async fn register(
        State(controller): State<Arc<Self>>,
        body: Bytes,
    ) -> Result<impl IntoResponse, ApiError> {
        let registration: SiteRegistration = serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("invalid site registration: {}", e)))?;

        let site = controller
            .resolver
            .resolve(registration.into_draft(Utc::now()))
            .await;

        info!(
            component = "directory",
            event = "site_registered",
            site = %site.name,
            uuid = %site.id,
            endpoint = %site.endpoint,
            "site registered"
        );
        metrics::inc_sites_registered();
        controller.registry.upsert(site);

        Ok(StatusCode::NO_CONTENT)
    }

    async fn search(State(controller): State<Arc<Self>>) -> Json<Vec<SiteSummary>> {
        Json(
            controller
                .registry
                .all()
                .iter()
                .map(|site| site.summary())
                .collect(),
        )
    }
}

impl Controller for SitesController {
    fn add_route(&self, router: Router) -> Router {
        router.merge(
            Router::new()
                .route(SITES_PATH, post(Self::register).get(Self::search))
                .with_state(Arc::new(self.clone())),
        )
    }
}
