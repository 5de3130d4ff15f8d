#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("liveness probe timeout is below 1ms")]
pub struct TimeoutIsTooShortError;
