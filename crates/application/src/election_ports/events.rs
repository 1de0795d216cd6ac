use async_trait::async_trait;
use leaderlease_core::AppResult;
use leaderlease_domain::ElectionEvent;

/// Port for publishing election lifecycle events.
#[async_trait]
pub trait ElectionEventRecorder: Send + Sync {
    /// Records one event. Failures are logged by the caller and never retried.
    async fn record_event(&self, event: ElectionEvent) -> AppResult<()>;
}
