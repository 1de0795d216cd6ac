use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use leaderlease_domain::{ElectionEvent, ElectionEventKind, LeaseKey};
use tracing::{info, warn};

use crate::election_ports::{ElectionEventRecorder, LeaderCallbacks};

/// Turns belief transitions into callback invocations and audit events.
///
/// Owned by the election loop, so every callback runs sequentially.
pub(super) struct ObserverDispatcher {
    lease_key: LeaseKey,
    identity: String,
    callbacks: Arc<dyn LeaderCallbacks>,
    recorder: Option<Arc<dyn ElectionEventRecorder>>,
    recorder_timeout: Duration,
    leading: bool,
    last_observed_leader: String,
}

impl ObserverDispatcher {
    pub(super) fn new(
        lease_key: LeaseKey,
        identity: String,
        callbacks: Arc<dyn LeaderCallbacks>,
        recorder_timeout: Duration,
    ) -> Self {
        Self {
            lease_key,
            identity,
            callbacks,
            recorder: None,
            recorder_timeout,
            leading: false,
            last_observed_leader: String::new(),
        }
    }

    pub(super) fn set_recorder(&mut self, recorder: Arc<dyn ElectionEventRecorder>) {
        self.recorder = Some(recorder);
    }

    pub(super) fn last_observed_leader(&self) -> &str {
        self.last_observed_leader.as_str()
    }

    /// Reports the holder seen on the latest read.
    ///
    /// Fires `on_new_leader` only when the holder changed. The change to this
    /// candidate is tracked but not reported; `on_started_leading` covers it.
    pub(super) async fn observed_leader(&mut self, holder: &str) {
        if holder == self.last_observed_leader {
            return;
        }

        self.last_observed_leader = holder.to_owned();
        if holder == self.identity {
            return;
        }

        info!(
            lease = %self.lease_key,
            identity = %self.identity,
            leader = %holder,
            "new leader observed"
        );
        self.callbacks.on_new_leader(holder);
        self.record(ElectionEventKind::ObservedLeader, holder).await;
    }

    pub(super) async fn started_leading(&mut self) {
        if self.leading {
            return;
        }

        self.leading = true;
        self.callbacks.on_started_leading(self.identity.as_str());
        let identity = self.identity.clone();
        self.record(ElectionEventKind::BecameLeader, identity.as_str())
            .await;
    }

    pub(super) async fn stopped_leading(&mut self) {
        if !self.leading {
            return;
        }

        self.leading = false;
        self.callbacks.on_stopped_leading();
        let identity = self.identity.clone();
        self.record(ElectionEventKind::StoppedLeading, identity.as_str())
            .await;
    }

    pub(super) async fn released(&mut self) {
        let identity = self.identity.clone();
        self.record(ElectionEventKind::Released, identity.as_str())
            .await;
    }

    async fn record(&self, kind: ElectionEventKind, holder: &str) {
        let Some(recorder) = self.recorder.as_ref() else {
            return;
        };

        let event = ElectionEvent {
            lease_key: self.lease_key.clone(),
            reporter: self.identity.clone(),
            holder_identity: holder.to_owned(),
            kind,
            occurred_at: Utc::now(),
        };

        match tokio::time::timeout(self.recorder_timeout, recorder.record_event(event)).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => warn!(
                lease = %self.lease_key,
                event = kind.as_str(),
                error = %error,
                "failed to record election event"
            ),
            Err(_) => warn!(
                lease = %self.lease_key,
                event = kind.as_str(),
                "timed out recording election event"
            ),
        }
    }
}
