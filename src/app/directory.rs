//! Directory role: site registry, matching pipeline and deploy fan-out.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Directory;
use crate::controller::{DirectoryDeployController, SitesController};
use crate::dispatch::{Dispatcher, HyperSiteClient};
use crate::geo::GeoLocator;
use crate::http::client::create_client;
use crate::http::Controller;
use crate::matcher::Pipeline;
use crate::registry::{read_sites_file, Registry, SiteResolver};
use crate::workers::{spawn_periodic, SiteEvictor};

use super::Role;

pub struct DirectoryRole {
    registry: Arc<Registry>,
    pipeline: Pipeline,
    dispatcher: Dispatcher,
    resolver: SiteResolver,
    locator: Arc<dyn GeoLocator>,
    max_results: usize,
    eviction_interval: Duration,
    eviction_max_age: Duration,
}

impl DirectoryRole {
    /// Builds the role from configuration, loading the static sites file.
    pub async fn from_config(cfg: &Directory) -> Result<Self> {
        let locator: Arc<dyn GeoLocator> = Arc::new(cfg.locator());
        let resolver = SiteResolver::new(locator.clone());

        let registry = Arc::new(Registry::new());
        if let Some(path) = &cfg.sites_file {
            for descriptor in read_sites_file(path).await? {
                registry.upsert(resolver.resolve(descriptor.into_draft()).await);
            }
            info!(
                component = "directory",
                event = "static_sites_loaded",
                path = ?path,
                sites = registry.len(),
                "static sites loaded"
            );
        }

        let pipeline = Pipeline::from_names(&cfg.matchers()).context("invalid directory.matchers")?;
        let site_client = HyperSiteClient::new(create_client(), cfg.dispatch_timeout());
        let dispatcher = Dispatcher::new(
            Arc::new(site_client),
            cfg.dispatch_concurrency(),
            cfg.dispatch_timeout(),
        );

        Ok(Self::new(cfg, registry, pipeline, dispatcher, locator))
    }

    pub fn new(
        cfg: &Directory,
        registry: Arc<Registry>,
        pipeline: Pipeline,
        dispatcher: Dispatcher,
        locator: Arc<dyn GeoLocator>,
    ) -> Self {
        Self {
            registry,
            pipeline,
            dispatcher,
            resolver: SiteResolver::new(locator.clone()),
            locator,
            max_results: cfg.max_results(),
            eviction_interval: cfg.eviction_interval(),
            eviction_max_age: cfg.eviction_max_age(),
        }
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }
}

impl Role for DirectoryRole {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn controllers(&self) -> Vec<Box<dyn Controller>> {
        vec![
            // Ranks sites and fans deploys out to them
            Box::new(DirectoryDeployController::new(
                self.registry.clone(),
                self.pipeline.clone(),
                self.dispatcher.clone(),
                self.locator.clone(),
                self.max_results,
            )),
            // Site registration and listing
            Box::new(SitesController::new(
                self.registry.clone(),
                self.resolver.clone(),
            )),
        ]
    }

    fn spawn_workers(&self, shutdown: CancellationToken) -> Vec<JoinHandle<()>> {
        let evictor = SiteEvictor::new(self.registry.clone(), self.eviction_max_age);
        vec![spawn_periodic(
            shutdown,
            Arc::new(evictor),
            self.eviction_interval,
        )]
    }
}
