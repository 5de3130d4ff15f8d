//! The stage abstraction and the lazily evaluated ranking it drives.

use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

use crate::model::{ClientContext, Site};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error("unknown matcher {0:?}")]
    UnknownStage(String),
    #[error("no matchers configured")]
    Empty,
}

/// One step of the ranking pipeline.
///
/// A stage removes the sites it ranks from `candidates` and returns them in
/// priority order. Sites it has no opinion about stay in `candidates` for
/// later stages; sites it drops are removed without being returned.
pub trait MatchStage: Send + Sync {
    fn name(&self) -> &'static str;

    fn select(
        &self,
        client: &ClientContext,
        workload: &Uuid,
        candidates: &mut Vec<Arc<Site>>,
    ) -> Vec<Arc<Site>>;
}

/// Ordered list of stages.
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<[Arc<dyn MatchStage>]>,
}

impl Pipeline {
    pub fn new(stages: Vec<Arc<dyn MatchStage>>) -> Result<Self, MatchError> {
        if stages.is_empty() {
            return Err(MatchError::Empty);
        }
        Ok(Self {
            stages: stages.into(),
        })
    }

    /// Builds a pipeline from stage names, see [`super::stage_by_name`].
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, MatchError> {
        let stages = names
            .iter()
            .map(|name| super::stage_by_name(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(stages)
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Ranks `sites` for `client`. Nothing runs until the ranking is pulled,
    /// and each stage runs only when the previous one is exhausted.
    pub fn rank(&self, client: ClientContext, workload: Uuid, sites: Vec<Arc<Site>>) -> Ranking {
        Ranking {
            stages: self.stages.clone(),
            next_stage: 0,
            client,
            workload,
            candidates: sites,
            ready: VecDeque::new(),
        }
    }
}

/// Finite, single pass sequence of ranked sites.
pub struct Ranking {
    stages: Arc<[Arc<dyn MatchStage>]>,
    next_stage: usize,
    client: ClientContext,
    workload: Uuid,
    candidates: Vec<Arc<Site>>,
    ready: VecDeque<Arc<Site>>,
}

impl Iterator for Ranking {
    type Item = Arc<Site>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(site) = self.ready.pop_front() {
                return Some(site);
            }
            if self.candidates.is_empty() {
                return None;
            }
            let stage = self.stages.get(self.next_stage)?.clone();
            self.next_stage += 1;
            self.ready
                .extend(stage.select(&self.client, &self.workload, &mut self.candidates));
        }
    }
}
