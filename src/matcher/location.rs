use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::geo::estimated_rtt;
use crate::model::{ClientContext, Site};

use super::MatchStage;

/// Ranks sites with a known location by distance to the client, nearest
/// first. Does nothing when the client's location is unknown.
#[derive(Debug, Default, Clone)]
pub struct LocationStage;

impl MatchStage for LocationStage {
    fn name(&self) -> &'static str {
        "location"
    }

    fn select(
        &self,
        client: &ClientContext,
        _workload: &Uuid,
        candidates: &mut Vec<Arc<Site>>,
    ) -> Vec<Arc<Site>> {
        let Some(origin) = client.location else {
            return Vec::new();
        };

        let mut ranked: Vec<(f64, Arc<Site>)> = Vec::new();
        let mut kept = Vec::with_capacity(candidates.len());
        for site in candidates.drain(..) {
            match site.distance_km(&origin) {
                Some(distance) => ranked.push((distance, site)),
                None => kept.push(site),
            }
        }
        *candidates = kept;

        // stable, equal distances keep their input order
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        ranked
            .into_iter()
            .map(|(distance, site)| {
                debug!(
                    component = "matcher",
                    event = "site_ranked",
                    site = %site.name,
                    distance_km = distance,
                    rtt_ms = estimated_rtt(distance) * 1000.0,
                    "ranked by distance"
                );
                site
            })
            .collect()
    }
}
