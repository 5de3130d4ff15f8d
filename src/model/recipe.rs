//! Workload recipes: which chart to install and how to configure it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum RecipeError {
    #[error("recipe is not a valid document: {0}")]
    Invalid(#[from] serde_yaml::Error),
    #[error("recipe field {0:?} must not be empty")]
    Empty(&'static str),
    #[error(transparent)]
    Repository(#[from] crate::repository::RepositoryError),
}

/// Raw document shape of `{uuid}.yaml`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecipeDocument {
    description: Option<String>,
    chart: String,
    version: String,
    values: Option<Map<String, Value>>,
    restricted: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    pub id: Uuid,
    pub description: Option<String>,
    pub chart: String,
    pub version: String,
    pub values: Map<String, Value>,
    /// Restricted recipes are never echoed back to callers.
    pub restricted: bool,
}

impl Recipe {
    pub fn from_yaml(id: Uuid, text: &str) -> Result<Self, RecipeError> {
        let doc: RecipeDocument = serde_yaml::from_str(text)?;
        if doc.chart.trim().is_empty() {
            return Err(RecipeError::Empty("chart"));
        }
        if doc.version.trim().is_empty() {
            return Err(RecipeError::Empty("version"));
        }
        Ok(Self {
            id,
            description: doc.description,
            chart: doc.chart,
            version: doc.version,
            values: doc.values.unwrap_or_default(),
            restricted: doc.restricted.unwrap_or(true),
        })
    }

    /// `chart-version`, also the package file stem.
    pub fn chart_version(&self) -> String {
        format!("{}-{}", self.chart, self.version)
    }

    /// Relative reference of the chart package inside the repository.
    pub fn chart_package(&self) -> String {
        format!("{}.tgz", self.chart_version())
    }

    /// Public description, only for unrestricted recipes.
    pub fn describe(&self) -> Option<RecipeDescription> {
        if self.restricted {
            return None;
        }
        Some(RecipeDescription {
            chart: self.chart.clone(),
            version: self.version.clone(),
            description: self.description.clone(),
            values: (!self.values.is_empty()).then(|| self.values.clone()),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeDescription {
    pub chart: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub values: Option<Map<String, Value>>,
}
