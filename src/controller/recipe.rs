use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::http::Controller;
use crate::model::RecipeDescription;
use crate::repository::Repository;

use super::error::ApiError;

pub const RECIPE_PATH: &str = "/recipes/:workload";

/// Describes unrestricted recipes. Restricted, missing and broken recipes
/// all look the same from outside: 404.
#[derive(Clone)]
pub struct RecipeController {
    repository: Repository,
}

impl RecipeController {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    async fn describe(
        State(controller): State<Arc<Self>>,
        Path(workload): Path<String>,
    ) -> Result<Json<RecipeDescription>, ApiError> {
        let not_found = || ApiError::not_found("no such recipe");
        let id = Uuid::parse_str(&workload).map_err(|_| not_found())?;

        let recipe = controller.repository.recipe(id).await.map_err(|e| {
            debug!(
                component = "site",
                event = "recipe_unavailable",
                workload = %id,
                error = %e,
                "recipe lookup failed"
            );
            not_found()
        })?;

        recipe.describe().map(Json).ok_or_else(not_found)
    }
}

impl Controller for RecipeController {
    fn add_route(&self, router: Router) -> Router {
        router.merge(
            Router::new()
                .route(RECIPE_PATH, get(Self::describe))
                .with_state(Arc::new(self.clone())),
        )
    }
}
