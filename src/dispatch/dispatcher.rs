//! Concurrent fan-out of deploy calls to the top ranked sites.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::model::{ClientContext, Site};

use super::merge::interleave;
use super::SiteClient;

/// Hard cap on results returned for one request.
pub const MAX_RESULTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("every candidate failed")]
    AllCandidatesFailed,
}

/// Clamps a requested result count to `[1, min(limit, MAX_RESULTS)]`.
pub fn clamp_results(requested: usize, limit: usize) -> usize {
    let limit = limit.clamp(1, MAX_RESULTS);
    requested.clamp(1, limit)
}

#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn SiteClient>,
    pool: Arc<Semaphore>,
    timeout: Duration,
}

impl Dispatcher {
    /// `concurrency` bounds outstanding site calls across all requests.
    pub fn new(client: Arc<dyn SiteClient>, concurrency: usize, timeout: Duration) -> Self {
        Self {
            client,
            pool: Arc::new(Semaphore::new(concurrency.max(1))),
            timeout,
        }
    }

    /// Calls every candidate concurrently and merges their answers in
    /// candidate order. Individual failures only shrink the result; an empty
    /// merged result is an error.
    pub async fn dispatch(
        &self,
        candidates: Vec<Arc<Site>>,
        workload: Uuid,
        client: &ClientContext,
        max_results: usize,
    ) -> Result<Vec<serde_json::Value>, DispatchError> {
        let calls = candidates
            .iter()
            .map(|site| self.call(site.clone(), workload, client));
        let answers = join_all(calls).await;

        let merged = interleave(answers, max_results);
        if merged.is_empty() {
            metrics::inc_dispatch_failures();
            warn!(
                component = "dispatcher",
                event = "all_candidates_failed",
                workload = %workload,
                candidates = candidates.len(),
                "no candidate site produced a deployment"
            );
            return Err(DispatchError::AllCandidatesFailed);
        }

        info!(
            component = "dispatcher",
            event = "dispatched",
            workload = %workload,
            candidates = candidates.len(),
            results = merged.len(),
            "deployment dispatched"
        );
        Ok(merged)
    }

    async fn call(
        &self,
        site: Arc<Site>,
        workload: Uuid,
        client: &ClientContext,
    ) -> Vec<serde_json::Value> {
        let _permit = match self.pool.acquire().await {
            Ok(permit) => permit,
            Err(_) => return Vec::new(),
        };

        let outcome = match timeout(self.timeout, self.client.deploy(&site, workload, client)).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::Timeout(self.timeout)),
        };

        match outcome {
            Ok(items) => items,
            Err(e) => {
                metrics::inc_candidate_failures();
                warn!(
                    component = "dispatcher",
                    event = "candidate_failed",
                    site = %site.name,
                    endpoint = %site.endpoint,
                    error = %e,
                    "deploy call to site failed"
                );
                Vec::new()
            }
        }
    }
}
