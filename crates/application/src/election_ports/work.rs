use async_trait::async_trait;

use crate::ShutdownSignal;

/// Work that may only run while this candidate holds the lease.
#[async_trait]
pub trait LeaderWork: Send + Sync {
    /// Runs for one leadership term.
    ///
    /// Started on its own task after `on_started_leading`. Implementations
    /// must return promptly once `stop` fires: the elector waits for this
    /// future before reporting the step-down and before vacating the lease.
    async fn run(&self, identity: String, stop: ShutdownSignal);
}
