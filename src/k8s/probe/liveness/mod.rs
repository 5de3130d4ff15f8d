// Kubernetes liveness probe.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

pub mod error;
pub mod service;

pub use error::TimeoutIsTooShortError;
pub use service::Service;

const MIN_TIMEOUT: Duration = Duration::from_millis(1);
const FALLBACK_TIMEOUT: Duration = Duration::from_millis(10);

/// Asks every watched service whether it is alive, within a deadline.
pub struct Probe {
    services: RwLock<Vec<Arc<dyn Service>>>,
    timeout: Duration,
}

impl Probe {
    pub fn new(timeout: Duration) -> Self {
        let timeout = if timeout < MIN_TIMEOUT {
            warn!(
                component = "liveness",
                event = "timeout_too_short",
                error = %TimeoutIsTooShortError,
                "min timeout duration is 1ms, using 10ms"
            );
            FALLBACK_TIMEOUT
        } else {
            timeout
        };

        Self {
            services: RwLock::new(Vec::new()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Adds services to the set checked on every probe.
    pub fn watch(&self, services: Vec<Arc<dyn Service>>) {
        self.services.write().extend(services);
    }

    /// True when every watched service answers alive before the deadline.
    /// A probe with nothing to watch is alive.
    pub async fn is_alive(&self) -> bool {
        let services = self.services.read().clone();
        let deadline = self.timeout;

        let check = tokio::task::spawn_blocking(move || {
            services.iter().all(|service| service.is_alive(deadline))
        });

        match timeout(deadline, check).await {
            Ok(Ok(alive)) => alive,
            Ok(Err(e)) => {
                warn!(
                    component = "liveness",
                    event = "check_failed",
                    error = %e,
                    "liveness check failed"
                );
                false
            }
            Err(_) => {
                warn!(
                    component = "liveness",
                    event = "deadline_exceeded",
                    "liveness probe deadline exceeded while checking services"
                );
                false
            }
        }
    }
}
