// HTTP controllers of both roles.

pub mod controller;
pub mod deploy;
pub mod error;
pub mod index;
pub mod instance;
pub mod metrics;
pub mod probe;
pub mod recipe;
pub mod sites;

pub use deploy::DirectoryDeployController;
pub use error::ApiError;
pub use index::IndexController;
pub use instance::InstanceController;
pub use metrics::{init_prometheus_exporter, PrometheusMetricsController};
pub use probe::LivenessProbeController;
pub use recipe::RecipeController;
pub use sites::SitesController;
