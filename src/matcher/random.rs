use rand::seq::SliceRandom;
use std::sync::Arc;
use uuid::Uuid;

use crate::model::{ClientContext, Site};

use super::MatchStage;

/// Catch-all: returns every remaining site in random order.
#[derive(Debug, Default, Clone)]
pub struct RandomStage;

impl MatchStage for RandomStage {
    fn name(&self) -> &'static str {
        "random"
    }

    fn select(
        &self,
        _client: &ClientContext,
        _workload: &Uuid,
        candidates: &mut Vec<Arc<Site>>,
    ) -> Vec<Arc<Site>> {
        let mut remaining = std::mem::take(candidates);
        remaining.shuffle(&mut rand::thread_rng());
        remaining
    }
}
