use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use leaderlease_core::{AppError, AppResult};
use leaderlease_domain::{ElectionConfig, ElectionState, LeaseRecord, VersionedLeaseRecord};
use tokio::time::Instant;
use tracing::debug;

use crate::election_ports::LeaseStore;

/// Local, never persisted view of lease ownership.
#[derive(Debug, Default)]
pub(super) struct ElectionBelief {
    observed: Option<VersionedLeaseRecord>,
    /// Local time the observed record last changed version.
    observed_at: Option<Instant>,
    last_renewed_at: Option<Instant>,
}

/// Result of one acquire-or-renew attempt that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum AttemptOutcome {
    /// This candidate holds the lease after the attempt.
    Holding,
    /// Another candidate holds an unexpired lease.
    HeldByOther(String),
}

/// Decides and performs lease writes; owns the election belief.
pub(super) struct ElectionStateMachine {
    config: ElectionConfig,
    store: Arc<dyn LeaseStore>,
    state: ElectionState,
    belief: ElectionBelief,
}

impl ElectionStateMachine {
    pub(super) fn new(config: ElectionConfig, store: Arc<dyn LeaseStore>) -> Self {
        Self {
            config,
            store,
            state: ElectionState::NotLeader,
            belief: ElectionBelief::default(),
        }
    }

    pub(super) fn config(&self) -> &ElectionConfig {
        &self.config
    }

    pub(super) fn state(&self) -> ElectionState {
        self.state
    }

    pub(super) fn set_state(&mut self, state: ElectionState) {
        if self.state != state {
            debug!(
                lease = %self.config.lease_key(),
                identity = %self.config.candidate_identity(),
                from = self.state.as_str(),
                to = state.as_str(),
                "election state changed"
            );
        }

        if state != ElectionState::Leading {
            self.belief.last_renewed_at = None;
        }

        self.state = state;
    }

    pub(super) fn is_leader(&self) -> bool {
        self.state == ElectionState::Leading
    }

    /// Holder of the last observed record, empty when vacant or unknown.
    pub(super) fn observed_holder(&self) -> &str {
        self.belief
            .observed
            .as_ref()
            .map_or("", |observed| observed.record.holder_identity.as_str())
    }

    pub(super) fn observed_transitions(&self) -> u32 {
        self.belief
            .observed
            .as_ref()
            .map_or(0, |observed| observed.record.leader_transitions)
    }

    /// Instant by which a renewal must succeed to keep leading.
    pub(super) fn renew_deadline_at(&self) -> Option<Instant> {
        self.belief
            .last_renewed_at
            .map(|renewed_at| renewed_at + self.config.timing().renew_deadline())
    }

    /// Reads the lease and claims or renews it when allowed.
    ///
    /// Store rejections come back as `AppError::Conflict` or
    /// `AppError::NotFound`; every call is bounded by `call_timeout`.
    pub(super) async fn try_acquire_or_renew(
        &mut self,
        call_timeout: Duration,
    ) -> AppResult<AttemptOutcome> {
        // Renewals are timed from before the read; the write cannot commit
        // earlier than this.
        let attempt_started = Instant::now();
        let key = self.config.lease_key().clone();
        let identity = self.config.candidate_identity().as_str().to_owned();
        let lease_duration_seconds = self.config.timing().lease_duration_seconds();
        let now = Utc::now();

        let current = match bounded(call_timeout, self.store.read(&key)).await {
            Ok(current) => current,
            Err(AppError::NotFound(_)) => {
                let record = LeaseRecord {
                    holder_identity: identity,
                    lease_duration_seconds,
                    acquire_time: now,
                    renew_time: now,
                    leader_transitions: 0,
                };
                let version = bounded(call_timeout, self.store.create(&key, &record)).await?;
                self.remember_write(VersionedLeaseRecord { record, version }, attempt_started);
                return Ok(AttemptOutcome::Holding);
            }
            Err(error) => return Err(error),
        };

        self.observe(current);
        let Some(observed) = self.belief.observed.clone() else {
            return Err(AppError::Internal(
                "lease record missing after observation".to_owned(),
            ));
        };

        let held_by_self = observed.record.is_held_by(identity.as_str());
        if !observed.record.is_vacant() && !held_by_self && !self.observed_is_expired() {
            return Ok(AttemptOutcome::HeldByOther(
                observed.record.holder_identity.clone(),
            ));
        }

        let record = if held_by_self {
            LeaseRecord {
                lease_duration_seconds,
                renew_time: now,
                ..observed.record.clone()
            }
        } else {
            LeaseRecord {
                holder_identity: identity,
                lease_duration_seconds,
                acquire_time: now,
                renew_time: now,
                leader_transitions: observed.record.leader_transitions.saturating_add(1),
            }
        };

        let version = bounded(
            call_timeout,
            self.store.update(&key, &record, &observed.version),
        )
        .await?;
        self.remember_write(VersionedLeaseRecord { record, version }, attempt_started);

        Ok(AttemptOutcome::Holding)
    }

    /// Re-reads the lease, typically after losing a write race.
    pub(super) async fn refresh(&mut self, call_timeout: Duration) -> AppResult<()> {
        let key = self.config.lease_key().clone();
        match bounded(call_timeout, self.store.read(&key)).await {
            Ok(current) => {
                self.observe(current);
                Ok(())
            }
            Err(AppError::NotFound(_)) => {
                self.belief.observed = None;
                self.belief.observed_at = None;
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Vacates the lease if the store still shows this candidate as holder.
    ///
    /// Returns `false` when there was nothing to release.
    pub(super) async fn release(&mut self, call_timeout: Duration) -> AppResult<bool> {
        let key = self.config.lease_key().clone();
        let identity = self.config.candidate_identity().as_str();

        let current = bounded(call_timeout, self.store.read(&key)).await?;
        if !current.record.is_held_by(identity) {
            self.observe(current);
            return Ok(false);
        }

        let now = Utc::now();
        let record = LeaseRecord {
            holder_identity: String::new(),
            lease_duration_seconds: 1,
            acquire_time: now,
            renew_time: now,
            leader_transitions: current.record.leader_transitions,
        };
        let version = bounded(
            call_timeout,
            self.store.update(&key, &record, &current.version),
        )
        .await?;
        self.observe(VersionedLeaseRecord { record, version });

        Ok(true)
    }

    fn observe(&mut self, current: VersionedLeaseRecord) {
        let changed = self
            .belief
            .observed
            .as_ref()
            .is_none_or(|observed| observed.version != current.version);

        if changed {
            self.belief.observed_at = Some(Instant::now());
        }

        self.belief.observed = Some(current);
    }

    fn remember_write(&mut self, written: VersionedLeaseRecord, attempt_started: Instant) {
        self.belief.observed = Some(written);
        self.belief.observed_at = Some(attempt_started);
        self.belief.last_renewed_at = Some(attempt_started);
    }

    /// True once the observed record stayed unchanged for longer than its
    /// declared lease duration, measured on the local monotonic clock.
    fn observed_is_expired(&self) -> bool {
        match (&self.belief.observed, self.belief.observed_at) {
            (Some(observed), Some(observed_at)) => {
                Instant::now().duration_since(observed_at) > observed.record.lease_duration()
            }
            _ => false,
        }
    }
}

async fn bounded<T>(
    call_timeout: Duration,
    call: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    tokio::time::timeout(call_timeout, call)
        .await
        .map_err(|_| {
            AppError::Transport(format!(
                "lease store call did not complete within {call_timeout:?}"
            ))
        })?
}
