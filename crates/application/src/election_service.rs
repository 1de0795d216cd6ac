use std::sync::Arc;

use leaderlease_domain::{ElectionConfig, LeaderSnapshot};
use tokio::task::JoinHandle;

use crate::election_ports::{ElectionEventRecorder, LeaderCallbacks, LeaderWork, LeaseStore};
use crate::shutdown::ShutdownTrigger;

mod dispatcher;
mod retry;
mod scheduler;
mod state_machine;
mod status;

pub use status::LeaderStatusReader;

use dispatcher::ObserverDispatcher;
use state_machine::ElectionStateMachine;
use status::LeaderStatusPublisher;

/// Leader work running for the current term.
struct ActiveLeaderWork {
    stop: ShutdownTrigger,
    handle: JoinHandle<()>,
}

/// Lease-based leader election for one candidate.
///
/// Build it with a validated [`ElectionConfig`], then drive it with
/// [`LeaderElector::run`] until the shutdown signal fires. Status is
/// available at any time through [`LeaderElector::status`].
pub struct LeaderElector {
    machine: ElectionStateMachine,
    dispatcher: ObserverDispatcher,
    status: LeaderStatusPublisher,
    work: Option<Arc<dyn LeaderWork>>,
    active_work: Option<ActiveLeaderWork>,
}

impl LeaderElector {
    /// Creates an elector. No store access happens before `run`.
    #[must_use]
    pub fn new(
        config: ElectionConfig,
        store: Arc<dyn LeaseStore>,
        callbacks: Arc<dyn LeaderCallbacks>,
    ) -> Self {
        let dispatcher = ObserverDispatcher::new(
            config.lease_key().clone(),
            config.candidate_identity().as_str().to_owned(),
            callbacks,
            config.timing().retry_period(),
        );

        Self {
            machine: ElectionStateMachine::new(config, store),
            dispatcher,
            status: LeaderStatusPublisher::new(),
            work: None,
            active_work: None,
        }
    }

    /// Adds work that runs only while this candidate leads.
    #[must_use]
    pub fn with_leader_work(mut self, work: Arc<dyn LeaderWork>) -> Self {
        self.work = Some(work);
        self
    }

    /// Adds an election event recorder.
    #[must_use]
    pub fn with_event_recorder(mut self, recorder: Arc<dyn ElectionEventRecorder>) -> Self {
        self.dispatcher.set_recorder(recorder);
        self
    }

    /// Returns the election configuration.
    #[must_use]
    pub fn config(&self) -> &ElectionConfig {
        self.machine.config()
    }

    /// Returns a reader of this elector's status snapshots.
    #[must_use]
    pub fn status(&self) -> LeaderStatusReader {
        self.status.reader()
    }

    fn publish_status(&self) {
        let identity = self.machine.config().candidate_identity().as_str();
        let is_leader = self.machine.is_leader();
        let last_observed = self.dispatcher.last_observed_leader();
        let leader_identity = if is_leader {
            identity.to_owned()
        } else if last_observed == identity {
            String::new()
        } else {
            last_observed.to_owned()
        };

        self.status.publish(LeaderSnapshot {
            leader_identity,
            is_leader,
            state: self.machine.state(),
            leader_transitions: self.machine.observed_transitions(),
        });
    }
}
