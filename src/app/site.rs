//! Site role: instances on the local cluster, recipe descriptions, expiry
//! and reporting to the directories.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::cluster::{ControlPlane, KubeControlPlane, KubeTarget, MetricsSource, PrometheusSource};
use crate::config::SiteTier;
use crate::controller::{InstanceController, RecipeController};
use crate::deployment::DeploymentManager;
use crate::http::client::create_client;
use crate::http::Controller;
use crate::repository::Repository;
use crate::workers::{spawn_periodic, InstanceReaper, Reporter};

use super::Role;

pub struct SiteRole {
    id: Uuid,
    repository: Repository,
    manager: Option<Arc<DeploymentManager>>,
    signals: Arc<dyn MetricsSource>,
    reporter: Option<Arc<Reporter>>,
    lease: Duration,
    expiry_interval: Duration,
    report_interval: Duration,
}

impl SiteRole {
    /// Connects to the cluster named by the configuration. A cluster that
    /// cannot be reached leaves the role running without instance routes.
    pub async fn from_config(cfg: &SiteTier) -> Result<Self> {
        let repository = Repository::new(cfg.recipes())
            .with_context(|| format!("invalid recipe repository {:?}", cfg.recipes()))?;

        let target = KubeTarget {
            kubeconfig: cfg.kubeconfig.clone(),
            context: cfg.kubecontext.clone(),
        };
        let control_plane = match KubeControlPlane::connect(target).await {
            Ok(cp) => Some(Arc::new(cp) as Arc<dyn ControlPlane>),
            Err(e) => {
                error!(
                    component = "site",
                    event = "control_plane_unavailable",
                    error = %format!("{:#}", e),
                    "cluster is not reachable, instance routes will answer 503"
                );
                None
            }
        };

        let signals = PrometheusSource::new(create_client(), &cfg.prometheus()?)
            .context("invalid site.prometheus")?;

        Self::new(cfg, repository, control_plane, Arc::new(signals))
    }

    pub fn new(
        cfg: &SiteTier,
        repository: Repository,
        control_plane: Option<Arc<dyn ControlPlane>>,
        signals: Arc<dyn MetricsSource>,
    ) -> Result<Self> {
        let id = cfg.id.unwrap_or_else(Uuid::new_v4);

        let manager = control_plane.map(|cp| {
            Arc::new(DeploymentManager::new(
                cp,
                repository.clone(),
                cfg.client_network(),
                cfg.create_attempts(),
            ))
        });

        let reporter = match cfg.reporting() {
            Some((directories, public_url)) => Some(Arc::new(
                Reporter::new(create_client(), id, &public_url, directories, signals.clone())
                    .context("invalid site.report")?,
            )),
            None => None,
        };

        info!(
            component = "site",
            event = "configured",
            site = %id,
            recipes = %repository.base(),
            cluster = manager.is_some(),
            reporting = reporter.is_some(),
            "site role configured"
        );

        Ok(Self {
            id,
            repository,
            manager,
            signals,
            reporter,
            lease: cfg.lease(),
            expiry_interval: cfg.expiry_interval(),
            report_interval: cfg.report_interval(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn manager(&self) -> Option<Arc<DeploymentManager>> {
        self.manager.clone()
    }
}

impl Role for SiteRole {
    fn name(&self) -> &'static str {
        "site"
    }

    fn controllers(&self) -> Vec<Box<dyn Controller>> {
        vec![
            // Create, resolve and expire instances
            Box::new(InstanceController::new(self.manager.clone())),
            // Describes unrestricted recipes
            Box::new(RecipeController::new(self.repository.clone())),
        ]
    }

    fn spawn_workers(&self, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        let Some(manager) = &self.manager else {
            warn!(
                component = "site",
                event = "jobs_skipped",
                "no cluster, expiry and reporting are not started"
            );
            return Vec::new();
        };

        let reaper = InstanceReaper::new(manager.clone(), self.signals.clone(), self.lease);
        let mut handles = vec![spawn_periodic(
            shutdown.clone(),
            Arc::new(reaper),
            self.expiry_interval,
        )];
        if let Some(reporter) = &self.reporter {
            handles.push(spawn_periodic(
                shutdown,
                reporter.clone(),
                self.report_interval,
            ));
        }
        handles
    }
}
