// Configuration loading and management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::geo::{GeoLocation, StaticLocator};
use crate::net::IpNetwork;

pub mod test_config;

pub use test_config::new_test_config;

pub const PROD: &str = "prod";
pub const DEV: &str = "dev";
pub const TEST: &str = "test";

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Cloudlet {
    #[serde(rename = "cloudletd")]
    pub cloudletd: CloudletBox,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CloudletBox {
    pub env: String,
    pub logs: Option<Logs>,
    pub api: Option<Api>,
    pub k8s: Option<K8S>,
    pub directory: Option<Directory>,
    pub site: Option<SiteTier>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Logs {
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Api {
    pub name: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Probe {
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct K8S {
    pub probe: Probe,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Dispatch {
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub concurrency: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Eviction {
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,
    #[serde(default, rename = "max_age", with = "humantime_serde")]
    pub max_age: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeoEntry {
    pub network: IpNetwork,
    pub location: GeoLocation,
}

/// Settings of the routing tier.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Directory {
    #[serde(rename = "sites_file")]
    pub sites_file: Option<PathBuf>,
    pub matchers: Option<Vec<String>>,
    #[serde(rename = "max_results")]
    pub max_results: Option<usize>,
    pub dispatch: Option<Dispatch>,
    pub eviction: Option<Eviction>,
    pub geo: Option<Vec<GeoEntry>>,
}

impl Directory {
    pub fn matchers(&self) -> Vec<String> {
        match &self.matchers {
            Some(names) if !names.is_empty() => names.clone(),
            _ => crate::matcher::DEFAULT_STAGES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn max_results(&self) -> usize {
        crate::dispatch::clamp_results(
            self.max_results.unwrap_or(crate::dispatch::MAX_RESULTS),
            crate::dispatch::MAX_RESULTS,
        )
    }

    pub fn dispatch_timeout(&self) -> Duration {
        self.dispatch
            .as_ref()
            .and_then(|d| d.timeout)
            .unwrap_or(Duration::from_secs(30))
    }

    pub fn dispatch_concurrency(&self) -> usize {
        self.dispatch.as_ref().and_then(|d| d.concurrency).unwrap_or(64)
    }

    pub fn eviction_interval(&self) -> Duration {
        self.eviction
            .as_ref()
            .and_then(|e| e.interval)
            .unwrap_or(Duration::from_secs(60))
    }

    pub fn eviction_max_age(&self) -> Duration {
        self.eviction
            .as_ref()
            .and_then(|e| e.max_age)
            .unwrap_or(Duration::from_secs(300))
    }

    pub fn locator(&self) -> StaticLocator {
        StaticLocator::new(
            self.geo
                .iter()
                .flatten()
                .map(|entry| (entry.network, entry.location)),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Report {
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,
    pub directories: Option<Vec<Url>>,
    #[serde(rename = "public_url")]
    pub public_url: Option<Url>,
}

/// Settings of the execution tier.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SiteTier {
    pub id: Option<Uuid>,
    pub recipes: Option<String>,
    pub kubeconfig: Option<PathBuf>,
    pub kubecontext: Option<String>,
    pub prometheus: Option<Url>,
    #[serde(rename = "client_network")]
    pub client_network: Option<IpNetwork>,
    #[serde(default, with = "humantime_serde")]
    pub lease: Option<Duration>,
    #[serde(default, rename = "expiry_interval", with = "humantime_serde")]
    pub expiry_interval: Option<Duration>,
    #[serde(rename = "create_attempts")]
    pub create_attempts: Option<usize>,
    pub report: Option<Report>,
}

impl SiteTier {
    pub fn recipes(&self) -> &str {
        self.recipes.as_deref().unwrap_or("RECIPES")
    }

    pub fn client_network(&self) -> IpNetwork {
        self.client_network.unwrap_or(IpNetwork::V4 {
            addr: std::net::Ipv4Addr::new(10, 5, 0, 0),
            prefix: 16,
        })
    }

    pub fn lease(&self) -> Duration {
        self.lease.unwrap_or(crate::workers::DEFAULT_LEASE)
    }

    pub fn expiry_interval(&self) -> Duration {
        self.expiry_interval.unwrap_or(Duration::from_secs(60))
    }

    pub fn create_attempts(&self) -> usize {
        self.create_attempts
            .unwrap_or(crate::deployment::DEFAULT_CREATE_ATTEMPTS)
            .max(1)
    }

    pub fn prometheus(&self) -> Result<Url> {
        match &self.prometheus {
            Some(url) => Ok(url.clone()),
            None => Url::parse("http://kube-prometheus-stack-prometheus.monitoring:9090/")
                .context("default prometheus url"),
        }
    }

    pub fn report_interval(&self) -> Duration {
        self.report
            .as_ref()
            .and_then(|r| r.interval)
            .unwrap_or(Duration::from_secs(15))
    }

    /// Directories to report to and the public url to report, when both are set.
    pub fn reporting(&self) -> Option<(Vec<Url>, Url)> {
        let report = self.report.as_ref()?;
        let directories = report.directories.clone().filter(|d| !d.is_empty())?;
        Some((directories, report.public_url.clone()?))
    }
}

// Config trait
pub trait ConfigTrait {
    fn logs(&self) -> Option<&Logs>;
    fn is_prod(&self) -> bool;
    fn is_test(&self) -> bool;
    fn api(&self) -> Option<&Api>;
    fn port(&self) -> u16;
    fn probe_timeout(&self) -> Duration;
    fn directory(&self) -> Directory;
    fn site(&self) -> SiteTier;
}

// Config type alias for convenience
pub type Config = Cloudlet;

impl ConfigTrait for Config {
    fn logs(&self) -> Option<&Logs> {
        self.cloudletd.logs.as_ref()
    }

    fn is_prod(&self) -> bool {
        self.cloudletd.env == PROD
    }

    fn is_test(&self) -> bool {
        self.cloudletd.env == TEST
    }

    fn api(&self) -> Option<&Api> {
        self.cloudletd.api.as_ref()
    }

    fn port(&self) -> u16 {
        self.api().and_then(|a| a.port).unwrap_or(DEFAULT_PORT)
    }

    fn probe_timeout(&self) -> Duration {
        self.cloudletd
            .k8s
            .as_ref()
            .and_then(|k| k.probe.timeout)
            .unwrap_or(DEFAULT_PROBE_TIMEOUT)
    }

    fn directory(&self) -> Directory {
        self.cloudletd.directory.clone().unwrap_or_default()
    }

    fn site(&self) -> SiteTier {
        self.cloudletd.site.clone().unwrap_or_default()
    }
}

impl Config {
    /// Loads configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let abs_path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve absolute config filepath: {:?}", path))?;

        let data = std::fs::read_to_string(&abs_path)
            .with_context(|| format!("read config yaml file {:?}", abs_path))?;

        Self::parse(&data).with_context(|| format!("unmarshal yaml from {:?}", abs_path))
    }

    pub fn parse(data: &str) -> Result<Self> {
        let cfg: Cloudlet = serde_yaml::from_str(data)?;
        if let Some(directory) = &cfg.cloudletd.directory {
            crate::matcher::Pipeline::from_names(&directory.matchers())
                .context("invalid directory.matchers")?;
        }
        Ok(cfg)
    }
}
