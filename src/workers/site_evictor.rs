use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::metrics;
use crate::registry::Registry;

use super::Job;

/// Drops registered sites that stopped reporting.
pub struct SiteEvictor {
    registry: Arc<Registry>,
    max_age: Duration,
}

impl SiteEvictor {
    pub fn new(registry: Arc<Registry>, max_age: Duration) -> Self {
        Self { registry, max_age }
    }

    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let evicted = self.registry.evict_stale(now, self.max_age);
        for site in &evicted {
            info!(
                component = "site_evictor",
                event = "site_evicted",
                site = %site.name,
                uuid = %site.id,
                "site went stale"
            );
        }
        metrics::add_sites_evicted(evicted.len() as u64);
        evicted.len()
    }
}

#[async_trait]
impl Job for SiteEvictor {
    fn name(&self) -> &'static str {
        "site_evictor"
    }

    async fn tick(&self, now: DateTime<Utc>) {
        self.sweep(now);
    }
}
