//! Site side of `/deploy/{workload}/{key}`: create, look up and remove the
//! client's instance on this site's cluster.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::deployment::DeploymentManager;
use crate::http::Controller;
use crate::metrics;
use crate::model::ClientKey;

use super::error::ApiError;

pub const INSTANCE_PATH: &str = "/deploy/:workload/:key";

/// Without a manager the site could not reach its cluster at startup and
/// every route answers 503.
#[derive(Clone)]
pub struct InstanceController {
    manager: Option<Arc<DeploymentManager>>,
}

impl InstanceController {
    pub fn new(manager: Option<Arc<DeploymentManager>>) -> Self {
        Self { manager }
    }

    fn manager(&self) -> Result<&DeploymentManager, ApiError> {
        self.manager.as_deref().ok_or_else(ApiError::unavailable)
    }

    async fn create(
        State(controller): State<Arc<Self>>,
        Path((workload, key)): Path<(String, String)>,
    ) -> Result<Response, ApiError> {
        metrics::inc_deploy_requests("site");
        let manager = controller.manager()?;
        let (workload, key) = parse_ids(&workload, &key)?;

        let instance = manager.create_or_get(workload, key).await?;
        let info = manager.info(&instance.record).await;
        Ok(Json(vec![info]).into_response())
    }

    async fn get(
        State(controller): State<Arc<Self>>,
        Path((workload, key)): Path<(String, String)>,
    ) -> Result<Response, ApiError> {
        let manager = controller.manager()?;
        let (workload, key) = parse_ids(&workload, &key)?;

        let record = manager
            .resolve(workload, &key)
            .await?
            .ok_or_else(|| ApiError::not_found("no such instance"))?;
        let info = manager.info(&record).await;
        Ok(Json(vec![info]).into_response())
    }

    async fn delete(
        State(controller): State<Arc<Self>>,
        Path((workload, key)): Path<(String, String)>,
    ) -> Result<Response, ApiError> {
        let manager = controller.manager()?;
        let (workload, key) = parse_ids(&workload, &key)?;

        let record = manager
            .resolve(workload, &key)
            .await?
            .ok_or_else(|| ApiError::not_found("no such instance"))?;
        manager.expire(&record).await?;

        info!(
            component = "site",
            event = "instance_deleted",
            instance = %record.name,
            workload = %workload,
            "instance deleted on request"
        );
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}

fn parse_ids(workload: &str, key: &str) -> Result<(Uuid, ClientKey), ApiError> {
    let workload = Uuid::parse_str(workload)
        .map_err(|_| ApiError::bad_request(format!("{:?} is not a workload id", workload)))?;
    let key = ClientKey::parse(key).map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok((workload, key))
}

impl Controller for InstanceController {
    fn add_route(&self, router: Router) -> Router {
        router.merge(
            Router::new()
                .route(
                    INSTANCE_PATH,
                    post(Self::create).get(Self::get).delete(Self::delete),
                )
                .with_state(Arc::new(self.clone())),
        )
    }
}
