//! Fixed interval background jobs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// One unit of periodic maintenance. A tick never overlaps with the previous
/// one of the same job.
#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    async fn tick(&self, now: DateTime<Utc>);
}

/// Runs `job` every `interval` until `shutdown` fires. Ticks that come due
/// while the job is still running are dropped, not queued. Shutdown only
/// interrupts the wait between ticks; a running tick is allowed to finish.
pub fn spawn_periodic(
    shutdown: CancellationToken,
    job: Arc<dyn Job>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            component = "workers",
            event = "started",
            job = job.name(),
            interval = %humantime::format_duration(interval),
            "periodic job started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(component = "workers", event = "stopped", job = job.name(), "periodic job stopped");
                    return;
                }
                _ = ticker.tick() => {
                    debug!(component = "workers", event = "tick", job = job.name());
                    job.tick(Utc::now()).await;
                }
            }
        }
    })
}
