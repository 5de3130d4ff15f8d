use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cluster::MetricsSource;
use crate::deployment::DeploymentManager;

use super::Job;

/// Default time an instance may live without tunnel activity.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(300);

/// Expires instances whose lease ran out and whose client went quiet.
pub struct InstanceReaper {
    manager: Arc<DeploymentManager>,
    signals: Arc<dyn MetricsSource>,
    lease: Duration,
}

impl InstanceReaper {
    pub fn new(manager: Arc<DeploymentManager>, signals: Arc<dyn MetricsSource>, lease: Duration) -> Self {
        Self {
            manager,
            signals,
            lease,
        }
    }

    /// Returns the names of the expired instances. Without a liveness
    /// snapshot nothing is expired.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Vec<String> {
        let Ok(lease) = chrono::Duration::from_std(self.lease) else {
            return Vec::new();
        };
        let cutoff = now - lease;

        let active = match self.signals.active_peers(cutoff).await {
            Ok(active) => active,
            Err(e) => {
                warn!(component = "instance_reaper", event = "signals_failed", error = %e, "skipping sweep");
                return Vec::new();
            }
        };
        let instances = match self.manager.instances().await {
            Ok(instances) => instances,
            Err(e) => {
                warn!(component = "instance_reaper", event = "list_failed", error = %e, "skipping sweep");
                return Vec::new();
            }
        };

        let mut expired = Vec::new();
        for record in instances {
            if record.created >= cutoff || active.contains(&record.key) {
                continue;
            }
            info!(
                component = "instance_reaper",
                event = "lease_expired",
                instance = %record.name,
                created = %record.created,
                "expiring idle instance"
            );
            if self.manager.expire(&record).await.is_ok() {
                expired.push(record.name);
            }
        }
        expired
    }
}

#[async_trait]
impl Job for InstanceReaper {
    fn name(&self) -> &'static str {
        "instance_reaper"
    }

    async fn tick(&self, now: DateTime<Utc>) {
        self.sweep(now).await;
    }
}
