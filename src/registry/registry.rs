//! In-memory registry of known sites.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::model::Site;

/// Sites keyed by identity. Entries are immutable once published; an update
/// swaps the whole entry so readers never see a half written site.
#[derive(Debug, Default)]
pub struct Registry {
    sites: RwLock<HashMap<Uuid, Arc<Site>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sites(sites: impl IntoIterator<Item = Site>) -> Self {
        let registry = Self::new();
        for site in sites {
            registry.upsert(site);
        }
        registry
    }

    /// Inserts or replaces the site with the same identity.
    pub fn upsert(&self, site: Site) {
        self.sites.write().insert(site.id, Arc::new(site));
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Site>> {
        self.sites.read().get(id).cloned()
    }

    /// Snapshot of every site, in no particular order.
    pub fn all(&self) -> Vec<Arc<Site>> {
        self.sites.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sites.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.read().is_empty()
    }

    /// Removes sites not updated since `now - max_age` and returns them.
    /// Sites without a timestamp are kept.
    pub fn evict_stale(&self, now: DateTime<Utc>, max_age: Duration) -> Vec<Arc<Site>> {
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return Vec::new();
        };
        let Some(cutoff) = now.checked_sub_signed(max_age) else {
            return Vec::new();
        };

        let mut sites = self.sites.write();
        let stale: Vec<Uuid> = sites
            .values()
            .filter(|site| site.last_update.is_some_and(|at| at < cutoff))
            .map(|site| site.id)
            .collect();
        stale.iter().filter_map(|id| sites.remove(id)).collect()
    }
}
