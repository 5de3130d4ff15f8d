//! Directory side of `POST /deploy/{workload}/{key}`: rank the known sites for
//! the client and fan the request out to the best of them.

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::dispatch::{clamp_results, Dispatcher};
use crate::geo::GeoLocator;
use crate::http::header::{client_address, client_location};
use crate::http::Controller;
use crate::matcher::Pipeline;
use crate::metrics;
use crate::model::{ClientContext, ClientKey};
use crate::registry::Registry;

use super::error::ApiError;

pub const DEPLOY_PATH: &str = "/deploy/:workload/:key";

#[derive(Debug, Deserialize)]
pub struct DeployQuery {
    results: Option<usize>,
}

#[derive(Clone)]
pub struct DirectoryDeployController {
    registry: Arc<Registry>,
    pipeline: Pipeline,
    dispatcher: Dispatcher,
    locator: Arc<dyn GeoLocator>,
    max_results: usize,
}

impl DirectoryDeployController {
    pub fn new(
        registry: Arc<Registry>,
        pipeline: Pipeline,
        dispatcher: Dispatcher,
        locator: Arc<dyn GeoLocator>,
        max_results: usize,
    ) -> Self {
        Self {
            registry,
            pipeline,
            dispatcher,
            locator,
            max_results,
        }
    }

    async fn deploy(
        State(controller): State<Arc<Self>>,
        Path((workload, key)): Path<(String, String)>,
        Query(query): Query<DeployQuery>,
        peer: Option<ConnectInfo<SocketAddr>>,
        headers: HeaderMap,
    ) -> Result<impl IntoResponse, ApiError> {
        metrics::inc_deploy_requests("directory");

        let workload = Uuid::parse_str(&workload)
            .map_err(|_| ApiError::bad_request(format!("{:?} is not a workload id", workload)))?;
        let key = ClientKey::parse(&key).map_err(|e| ApiError::bad_request(e.to_string()))?;
        let address =
            client_address(&headers, peer.map(|ConnectInfo(addr)| addr)).map_err(ApiError::bad_request)?;
        let location = client_location(&headers, address, controller.locator.as_ref());
        let client = ClientContext::new(key, address, location);

        let count = clamp_results(query.results.unwrap_or(1), controller.max_results);
        let candidates: Vec<_> = controller
            .pipeline
            .rank(client.clone(), workload, controller.registry.all())
            .take(count)
            .collect();

        debug!(
            component = "directory",
            event = "ranked",
            workload = %workload,
            client = %address,
            candidates = ?candidates.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "candidate sites ranked"
        );

        let results = controller
            .dispatcher
            .dispatch(candidates, workload, &client, count)
            .await
            .map_err(|_| ApiError::internal("something went wrong"))?;

        info!(
            component = "directory",
            event = "deployed",
            workload = %workload,
            client = %address,
            results = results.len(),
            "deploy request served"
        );

        Ok(Json(results))
    }
}

impl Controller for DirectoryDeployController {
    fn add_route(&self, router: Router) -> Router {
        router.merge(
            Router::new()
                .route(DEPLOY_PATH, post(Self::deploy))
                .with_state(Arc::new(self.clone())),
        )
    }
}
