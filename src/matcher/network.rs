use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::model::{ClientContext, Site};

use super::MatchStage;

/// Outcome of looking at one site from the client's network position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No opinion, leave it to later stages.
    Keep,
    /// Never route this client here.
    Drop,
    /// Topologically close, rank it now.
    Yield,
}

/// Rejections win over everything, local networks come next, and clients
/// outside every accepted network are turned away.
pub fn judge(site: &Site, addr: IpAddr) -> Verdict {
    if site.is_rejected(addr) {
        Verdict::Drop
    } else if site.is_local(addr) {
        Verdict::Yield
    } else if !site.is_accepted(addr) {
        Verdict::Drop
    } else {
        Verdict::Keep
    }
}

/// Ranks sites whose local networks contain the client address.
#[derive(Debug, Default, Clone)]
pub struct NetworkStage;

impl MatchStage for NetworkStage {
    fn name(&self) -> &'static str {
        "network"
    }

    fn select(
        &self,
        client: &ClientContext,
        _workload: &Uuid,
        candidates: &mut Vec<Arc<Site>>,
    ) -> Vec<Arc<Site>> {
        let mut selected = Vec::new();
        let mut kept = Vec::with_capacity(candidates.len());

        for site in candidates.drain(..) {
            match judge(&site, client.address) {
                Verdict::Keep => kept.push(site),
                Verdict::Yield => selected.push(site),
                Verdict::Drop => {
                    debug!(
                        component = "matcher",
                        event = "site_dropped",
                        site = %site.name,
                        client = %client.address,
                        "client not admitted by site"
                    );
                }
            }
        }

        *candidates = kept;
        selected
    }
}
