// Candidate ranking: a pipeline of named stages.

pub mod location;
pub mod network;
pub mod random;
pub mod stage;

use std::sync::Arc;

pub use location::LocationStage;
pub use network::{judge, NetworkStage, Verdict};
pub use random::RandomStage;
pub use stage::{MatchError, MatchStage, Pipeline, Ranking};

/// Stage order used when none is configured.
pub const DEFAULT_STAGES: [&str; 3] = ["network", "location", "random"];

/// Looks up a built-in stage by its configured name.
pub fn stage_by_name(name: &str) -> Result<Arc<dyn MatchStage>, MatchError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "network" => Ok(Arc::new(NetworkStage)),
        "location" => Ok(Arc::new(LocationStage)),
        "random" => Ok(Arc::new(RandomStage)),
        _ => Err(MatchError::UnknownStage(name.to_string())),
    }
}
