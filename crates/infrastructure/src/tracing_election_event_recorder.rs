use async_trait::async_trait;
use leaderlease_application::ElectionEventRecorder;
use leaderlease_core::AppResult;
use leaderlease_domain::ElectionEvent;

/// Election event recorder that writes events to the tracing pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingElectionEventRecorder;

impl TracingElectionEventRecorder {
    /// Creates a tracing event recorder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ElectionEventRecorder for TracingElectionEventRecorder {
    async fn record_event(&self, event: ElectionEvent) -> AppResult<()> {
        tracing::info!(
            lease = %event.lease_key,
            reporter = %event.reporter,
            holder = %event.holder_identity,
            event = event.kind.as_str(),
            occurred_at = %event.occurred_at.to_rfc3339(),
            "election event"
        );

        Ok(())
    }
}
