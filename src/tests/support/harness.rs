// Boots a role on an ephemeral port, with fakes in place of the cluster.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::app::{App, DirectoryRole, Role, SiteRole};
use crate::config::{self, Config, ConfigTrait};
use crate::dispatch::{Dispatcher, HyperSiteClient};
use crate::geo::GeoLocator;
use crate::http::client::create_client;
use crate::liveness;
use crate::matcher::Pipeline;
use crate::model::Site;
use crate::registry::Registry;
use crate::shutdown::GracefulShutdown;

use super::fake_cluster::{MemoryControlPlane, StaticMetrics};
use super::recipes::site_repository;

/// A running app serving on `127.0.0.1`.
pub struct RunningApp {
    addr: SocketAddr,
    app: App,
    shutdown_token: CancellationToken,
    graceful: GracefulShutdown,
}

impl RunningApp {
    pub async fn start(cfg: &Config, role: Arc<dyn Role>) -> Self {
        let shutdown_token = CancellationToken::new();
        let probe = Arc::new(liveness::Probe::new(Duration::from_secs(1)));
        let app = App::new(shutdown_token.clone(), cfg, role, probe.clone());
        probe.watch(vec![Arc::new(app.clone()) as Arc<dyn liveness::Service>]);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let graceful = GracefulShutdown::new(shutdown_token.clone());
        graceful.set_graceful_timeout(Duration::from_secs(5));
        graceful.add(1);
        app.serve_on(listener, graceful.clone()).unwrap();

        let running = Self {
            addr,
            app,
            shutdown_token,
            graceful,
        };
        running.wait_alive().await;
        running
    }

    async fn wait_alive(&self) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        let client = reqwest::Client::new();
        while tokio::time::Instant::now() < deadline {
            if let Ok(resp) = client.get(self.url("/k8s/probe")).send().await {
                if resp.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("app at {} did not come up", self.addr);
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    /// Shuts down and waits for the server and the jobs.
    pub async fn stop(self) {
        self.graceful.cancel_and_wait().await.unwrap();
    }
}

impl Drop for RunningApp {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

/// Directory over a fixed set of sites, using the default matchers.
pub fn directory_role(cfg: &Config, sites: Vec<Site>, locator: Arc<dyn GeoLocator>) -> Arc<DirectoryRole> {
    let directory = cfg.directory();
    let dispatcher = Dispatcher::new(
        Arc::new(HyperSiteClient::new(create_client(), directory.dispatch_timeout())),
        directory.dispatch_concurrency(),
        directory.dispatch_timeout(),
    );
    Arc::new(DirectoryRole::new(
        &directory,
        Arc::new(Registry::with_sites(sites)),
        Pipeline::from_names(&directory.matchers()).unwrap(),
        dispatcher,
        locator,
    ))
}

/// Site role over an in-memory cluster and the hello/secret recipes.
pub struct SiteFixture {
    pub _recipes: TempDir,
    pub cluster: Arc<MemoryControlPlane>,
    pub signals: Arc<StaticMetrics>,
    pub role: Arc<SiteRole>,
}

pub fn site_fixture(cfg: &Config) -> SiteFixture {
    build_site(cfg, true)
}

/// Same as [`site_fixture`], but the cluster was never reached.
pub fn site_fixture_without_cluster(cfg: &Config) -> SiteFixture {
    build_site(cfg, false)
}

fn build_site(cfg: &Config, with_cluster: bool) -> SiteFixture {
    let (recipes, repository) = site_repository();
    let cluster = Arc::new(MemoryControlPlane::new());
    let signals = Arc::new(StaticMetrics::with_resources(&[("cpu_ratio", 0.25)]));
    let control_plane = with_cluster.then(|| cluster.clone() as Arc<dyn crate::cluster::ControlPlane>);
    let role = SiteRole::new(&cfg.site(), repository, control_plane, signals.clone()).unwrap();
    SiteFixture {
        _recipes: recipes,
        cluster,
        signals,
        role: Arc::new(role),
    }
}

pub fn test_config() -> Config {
    config::new_test_config()
}
