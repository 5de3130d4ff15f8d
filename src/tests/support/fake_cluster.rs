// In-memory control plane and metrics source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::cluster::{ControlPlane, ControlPlaneError, LabelSelector, MetricsSource, PeerResource};
use crate::model::{ClientKey, SiteTunnel};

type CreateHook = Box<dyn FnOnce(&mut BTreeMap<String, PeerResource>) + Send>;

pub struct MemoryControlPlane {
    peers: Mutex<BTreeMap<String, PeerResource>>,
    releases: Mutex<BTreeMap<String, String>>,
    deleted: Mutex<Vec<String>>,
    on_create: Mutex<Option<CreateHook>>,
    failing: AtomicBool,
    uninstall_failing: AtomicBool,
    uninstall_delay: Mutex<Duration>,
    tunnel: SiteTunnel,
}

impl Default for MemoryControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryControlPlane {
    pub fn new() -> Self {
        Self {
            peers: Mutex::new(BTreeMap::new()),
            releases: Mutex::new(BTreeMap::new()),
            deleted: Mutex::new(Vec::new()),
            on_create: Mutex::new(None),
            failing: AtomicBool::new(false),
            uninstall_failing: AtomicBool::new(false),
            uninstall_delay: Mutex::new(Duration::ZERO),
            tunnel: SiteTunnel {
                public_key: "c2l0ZS10dW5uZWwta2V5LWZvci10ZXN0cy0xMjM0NTY=".to_string(),
                endpoint: "203.0.113.10:51820".to_string(),
                dns: IpAddr::V4(Ipv4Addr::new(10, 43, 0, 10)),
            },
        }
    }

    /// Runs `hook` against the stored peers right after the next successful
    /// create, simulating a concurrent writer.
    pub fn after_next_create(&self, hook: impl FnOnce(&mut BTreeMap<String, PeerResource>) + Send + 'static) {
        *self.on_create.lock() = Some(Box::new(hook));
    }

    /// Makes every operation fail with `Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes only `uninstall_release` fail.
    pub fn set_uninstall_failing(&self, failing: bool) {
        self.uninstall_failing.store(failing, Ordering::SeqCst);
    }

    /// Makes `uninstall_release` take `delay` before it acts.
    pub fn set_uninstall_delay(&self, delay: Duration) {
        *self.uninstall_delay.lock() = delay;
    }

    pub fn install(&self, name: &str, chart_ref: &str) {
        self.releases.lock().insert(name.to_string(), chart_ref.to_string());
    }

    pub fn insert(&self, peer: PeerResource) {
        self.peers.lock().insert(peer.name.clone(), peer);
    }

    pub fn peers(&self) -> Vec<PeerResource> {
        self.peers.lock().values().cloned().collect()
    }

    pub fn peer_names(&self) -> BTreeSet<String> {
        self.peers.lock().keys().cloned().collect()
    }

    pub fn releases(&self) -> BTreeMap<String, String> {
        self.releases.lock().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().clone()
    }

    fn check(&self) -> Result<(), ControlPlaneError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ControlPlaneError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl ControlPlane for MemoryControlPlane {
    async fn create_peer(&self, peer: &PeerResource) -> Result<(), ControlPlaneError> {
        tokio::task::yield_now().await;
        self.check()?;
        {
            let mut peers = self.peers.lock();
            if peers.contains_key(&peer.name) {
                return Err(ControlPlaneError::AlreadyExists(peer.name.clone()));
            }
            peers.insert(peer.name.clone(), peer.clone());
            if let Some(hook) = self.on_create.lock().take() {
                hook(&mut peers);
            }
        }
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn list_peers(&self, selector: &LabelSelector) -> Result<Vec<PeerResource>, ControlPlaneError> {
        tokio::task::yield_now().await;
        self.check()?;
        Ok(self
            .peers
            .lock()
            .values()
            .filter(|p| selector.matches(&p.labels))
            .cloned()
            .collect())
    }

    async fn delete_peer(&self, name: &str) -> Result<(), ControlPlaneError> {
        self.check()?;
        if self.peers.lock().remove(name).is_some() {
            self.deleted.lock().push(name.to_string());
        }
        Ok(())
    }

    async fn install_release(
        &self,
        name: &str,
        chart_ref: &str,
        _values: &Map<String, Value>,
    ) -> Result<(), ControlPlaneError> {
        self.check()?;
        self.releases.lock().insert(name.to_string(), chart_ref.to_string());
        Ok(())
    }

    async fn uninstall_release(&self, name: &str) -> Result<(), ControlPlaneError> {
        let delay = *self.uninstall_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.check()?;
        if self.uninstall_failing.load(Ordering::SeqCst) {
            return Err(ControlPlaneError::Unavailable);
        }
        self.releases.lock().remove(name);
        Ok(())
    }

    fn tunnel(&self) -> &SiteTunnel {
        &self.tunnel
    }
}

/// Metrics source with scripted resources and handshakes.
#[derive(Default)]
pub struct StaticMetrics {
    resources: Mutex<BTreeMap<String, f64>>,
    handshakes: Mutex<Vec<(ClientKey, DateTime<Utc>)>>,
    failing: AtomicBool,
}

impl StaticMetrics {
    pub fn with_resources(resources: &[(&str, f64)]) -> Self {
        let me = Self::default();
        *me.resources.lock() = resources.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        me
    }

    pub fn handshake(&self, key: ClientKey, at: DateTime<Utc>) {
        self.handshakes.lock().push((key, at));
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl MetricsSource for StaticMetrics {
    async fn resources(&self) -> BTreeMap<String, f64> {
        self.resources.lock().clone()
    }

    async fn active_peers(&self, cutoff: DateTime<Utc>) -> anyhow::Result<HashSet<ClientKey>> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("metrics backend unavailable");
        }
        Ok(self
            .handshakes
            .lock()
            .iter()
            .filter(|(_, at)| *at >= cutoff)
            .map(|(key, _)| *key)
            .collect())
    }
}
