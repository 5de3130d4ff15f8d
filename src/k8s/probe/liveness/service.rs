use std::time::Duration;

/// Something the liveness probe can ask about.
pub trait Service: Send + Sync {
    fn is_alive(&self, timeout: Duration) -> bool;
}
