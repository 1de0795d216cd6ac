use std::time::Duration;

use chrono::{DateTime, Utc};
use leaderlease_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::lease::LeaseKey;

/// Namespace used when the caller does not pick one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Lease duration used by [`ElectionConfig::simple`].
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(10);

/// First wait of the exponential retry strategy.
pub const DEFAULT_START_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound of the exponential retry strategy.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Validated lease timing parameters.
///
/// `lease_duration > renew_deadline > retry_period > 0` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElectionTiming {
    lease_duration: Duration,
    renew_deadline: Duration,
    retry_period: Duration,
}

impl ElectionTiming {
    /// Creates validated timing parameters.
    pub fn new(
        lease_duration: Duration,
        renew_deadline: Duration,
        retry_period: Duration,
    ) -> AppResult<Self> {
        if retry_period.is_zero() {
            return Err(AppError::Validation(
                "retry_period must be greater than zero".to_owned(),
            ));
        }

        if renew_deadline <= retry_period {
            return Err(AppError::Validation(format!(
                "renew_deadline ({renew_deadline:?}) must be greater than retry_period ({retry_period:?})"
            )));
        }

        if lease_duration <= renew_deadline {
            return Err(AppError::Validation(format!(
                "lease_duration ({lease_duration:?}) must be greater than renew_deadline ({renew_deadline:?})"
            )));
        }

        if lease_duration < Duration::from_secs(1) {
            return Err(AppError::Validation(
                "lease_duration must be at least one second".to_owned(),
            ));
        }

        if lease_duration.as_secs() > u64::from(u32::MAX) {
            return Err(AppError::Validation(
                "lease_duration does not fit in a lease record".to_owned(),
            ));
        }

        Ok(Self {
            lease_duration,
            renew_deadline,
            retry_period,
        })
    }

    /// Derives timing from one ttl: renew deadline at half, retry at a quarter.
    pub fn from_ttl(ttl: Duration) -> AppResult<Self> {
        Self::new(ttl, ttl / 2, ttl / 4)
    }

    /// Returns how long a lease stays valid without renewal.
    #[must_use]
    pub fn lease_duration(&self) -> Duration {
        self.lease_duration
    }

    /// Returns how long a leader keeps retrying renewal before stepping down.
    #[must_use]
    pub fn renew_deadline(&self) -> Duration {
        self.renew_deadline
    }

    /// Returns the wait between attempts.
    #[must_use]
    pub fn retry_period(&self) -> Duration {
        self.retry_period
    }

    /// Returns the lease duration in whole seconds, rounded up.
    #[must_use]
    pub fn lease_duration_seconds(&self) -> u32 {
        let seconds = self.lease_duration.as_secs()
            + u64::from(self.lease_duration.subsec_nanos() > 0);
        u32::try_from(seconds).unwrap_or(u32::MAX)
    }
}

/// Wait policy applied between failed acquisition attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryStrategy {
    /// Poll every retry period.
    #[default]
    Fixed,
    /// Double the wait after each failed attempt, bounded by `max`.
    Exponential {
        /// First wait after a failed attempt.
        start: Duration,
        /// Largest wait.
        max: Duration,
    },
}

impl RetryStrategy {
    /// Exponential strategy with the default one second to one minute bounds.
    #[must_use]
    pub fn exponential() -> Self {
        Self::Exponential {
            start: DEFAULT_START_BACKOFF,
            max: DEFAULT_MAX_BACKOFF,
        }
    }

    fn validate(self) -> AppResult<Self> {
        if let Self::Exponential { start, max } = self {
            if start.is_zero() {
                return Err(AppError::Validation(
                    "exponential retry start must be greater than zero".to_owned(),
                ));
            }

            if max < start {
                return Err(AppError::Validation(
                    "exponential retry max must not be lower than start".to_owned(),
                ));
            }
        }

        Ok(self)
    }
}

/// Validated election configuration for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionConfig {
    election_id: NonEmptyString,
    candidate_identity: NonEmptyString,
    namespace: NonEmptyString,
    lease_key: LeaseKey,
    timing: ElectionTiming,
    release_on_cancel: bool,
    retry_strategy: RetryStrategy,
}

/// Input payload used to construct a validated election configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionConfigInput {
    /// Lease name all candidates compete for.
    pub election_id: String,
    /// Unique identity of this candidate.
    pub candidate_identity: String,
    /// Lease namespace.
    pub namespace: String,
    /// Lease timing.
    pub timing: ElectionTiming,
    /// Whether to vacate the lease when the election is cancelled while leading.
    pub release_on_cancel: bool,
    /// Wait policy while not leading.
    pub retry_strategy: RetryStrategy,
}

impl ElectionConfig {
    /// Creates a validated election configuration.
    pub fn new(input: ElectionConfigInput) -> AppResult<Self> {
        let ElectionConfigInput {
            election_id,
            candidate_identity,
            namespace,
            timing,
            release_on_cancel,
            retry_strategy,
        } = input;

        let election_id = NonEmptyString::new(election_id)
            .map_err(|_| AppError::Validation("election id must not be empty".to_owned()))?;
        let candidate_identity = NonEmptyString::new(candidate_identity).map_err(|_| {
            AppError::Validation("candidate identity must not be empty".to_owned())
        })?;
        let namespace = NonEmptyString::new(namespace)
            .map_err(|_| AppError::Validation("namespace must not be empty".to_owned()))?;
        let lease_key = LeaseKey::new(namespace.as_str(), election_id.as_str())?;

        Ok(Self {
            election_id,
            candidate_identity,
            namespace,
            lease_key,
            timing,
            release_on_cancel,
            retry_strategy: retry_strategy.validate()?,
        })
    }

    /// Creates a configuration in the default namespace with a ten second ttl.
    pub fn simple(
        election_id: impl Into<String>,
        candidate_identity: impl Into<String>,
    ) -> AppResult<Self> {
        Self::new(ElectionConfigInput {
            election_id: election_id.into(),
            candidate_identity: candidate_identity.into(),
            namespace: DEFAULT_NAMESPACE.to_owned(),
            timing: ElectionTiming::from_ttl(DEFAULT_LEASE_TTL)?,
            release_on_cancel: true,
            retry_strategy: RetryStrategy::Fixed,
        })
    }

    /// Returns the election id.
    #[must_use]
    pub fn election_id(&self) -> &NonEmptyString {
        &self.election_id
    }

    /// Returns this candidate's identity.
    #[must_use]
    pub fn candidate_identity(&self) -> &NonEmptyString {
        &self.candidate_identity
    }

    /// Returns the lease namespace.
    #[must_use]
    pub fn namespace(&self) -> &NonEmptyString {
        &self.namespace
    }

    /// Returns the lease timing.
    #[must_use]
    pub fn timing(&self) -> ElectionTiming {
        self.timing
    }

    /// Returns whether the lease is vacated on cancellation.
    #[must_use]
    pub fn release_on_cancel(&self) -> bool {
        self.release_on_cancel
    }

    /// Returns the retry strategy.
    #[must_use]
    pub fn retry_strategy(&self) -> RetryStrategy {
        self.retry_strategy
    }

    /// Returns the store key of the contested lease.
    #[must_use]
    pub fn lease_key(&self) -> &LeaseKey {
        &self.lease_key
    }
}

/// Election lifecycle state of one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionState {
    /// Not holding the lease; polling for acquisition.
    #[default]
    NotLeader,
    /// An acquisition write is in flight.
    Acquiring,
    /// Holding the lease and renewing it.
    Leading,
    /// Cancelled while leading; vacating the lease.
    Releasing,
    /// Election loop has terminated.
    Stopped,
}

impl ElectionState {
    /// Returns stable state value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotLeader => "not_leader",
            Self::Acquiring => "acquiring",
            Self::Leading => "leading",
            Self::Releasing => "releasing",
            Self::Stopped => "stopped",
        }
    }
}

/// Read-only copy of a candidate's election status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LeaderSnapshot {
    /// Last observed leader, empty when unknown or vacant.
    pub leader_identity: String,
    /// Whether this candidate currently believes it leads.
    pub is_leader: bool,
    /// Current lifecycle state.
    pub state: ElectionState,
    /// Transition counter of the last observed record.
    pub leader_transitions: u32,
}

/// Kind of a recorded election event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionEventKind {
    /// This candidate acquired the lease.
    BecameLeader,
    /// This candidate stopped leading.
    StoppedLeading,
    /// A different holder was observed.
    ObservedLeader,
    /// This candidate vacated the lease.
    Released,
}

impl ElectionEventKind {
    /// Returns stable event kind value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BecameLeader => "became_leader",
            Self::StoppedLeading => "stopped_leading",
            Self::ObservedLeader => "observed_leader",
            Self::Released => "released",
        }
    }
}

/// Election lifecycle event emitted for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionEvent {
    /// Lease the event refers to.
    pub lease_key: LeaseKey,
    /// Candidate that emitted the event.
    pub reporter: String,
    /// Holder identity the event is about.
    pub holder_identity: String,
    /// Event kind.
    pub kind: ElectionEventKind,
    /// Wall-clock time of the event.
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use leaderlease_core::AppError;
    use proptest::prelude::*;

    use super::{ElectionConfig, ElectionConfigInput, ElectionTiming, RetryStrategy};

    fn timing() -> ElectionTiming {
        ElectionTiming::from_ttl(Duration::from_secs(10)).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn from_ttl_derives_half_and_quarter() {
        let timing = timing();
        assert_eq!(timing.lease_duration(), Duration::from_secs(10));
        assert_eq!(timing.renew_deadline(), Duration::from_secs(5));
        assert_eq!(timing.retry_period(), Duration::from_millis(2500));
        assert_eq!(timing.lease_duration_seconds(), 10);
    }

    #[test]
    fn timing_rejects_inverted_deadlines() {
        let result = ElectionTiming::new(
            Duration::from_secs(10),
            Duration::from_secs(2),
            Duration::from_secs(2),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = ElectionTiming::new(
            Duration::from_secs(5),
            Duration::from_secs(5),
            Duration::from_secs(2),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn lease_seconds_round_up() {
        let timing = ElectionTiming::new(
            Duration::from_millis(1500),
            Duration::from_millis(1000),
            Duration::from_millis(200),
        )
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(timing.lease_duration_seconds(), 2);
    }

    #[test]
    fn config_rejects_blank_identity() {
        let result = ElectionConfig::new(ElectionConfigInput {
            election_id: "scheduler".to_owned(),
            candidate_identity: "  ".to_owned(),
            namespace: "default".to_owned(),
            timing: timing(),
            release_on_cancel: true,
            retry_strategy: RetryStrategy::Fixed,
        });
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn config_rejects_inverted_backoff_bounds() {
        let result = ElectionConfig::new(ElectionConfigInput {
            election_id: "scheduler".to_owned(),
            candidate_identity: "node-a".to_owned(),
            namespace: "default".to_owned(),
            timing: timing(),
            release_on_cancel: false,
            retry_strategy: RetryStrategy::Exponential {
                start: Duration::from_secs(10),
                max: Duration::from_secs(1),
            },
        });
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn simple_config_uses_defaults() {
        let config =
            ElectionConfig::simple("scheduler", "node-a").unwrap_or_else(|_| unreachable!());
        assert_eq!(config.namespace().as_str(), "default");
        assert!(config.release_on_cancel());
        assert_eq!(config.retry_strategy(), RetryStrategy::Fixed);
        assert_eq!(config.lease_key().to_string(), "default/scheduler");
    }

    proptest! {
        #[test]
        fn accepted_timing_is_strictly_ordered(
            lease_ms in 0_u64..120_000,
            renew_ms in 0_u64..120_000,
            retry_ms in 0_u64..120_000,
        ) {
            let result = ElectionTiming::new(
                Duration::from_millis(lease_ms),
                Duration::from_millis(renew_ms),
                Duration::from_millis(retry_ms),
            );

            if let Ok(timing) = result {
                prop_assert!(timing.lease_duration() > timing.renew_deadline());
                prop_assert!(timing.renew_deadline() > timing.retry_period());
                prop_assert!(!timing.retry_period().is_zero());
            } else {
                prop_assert!(
                    lease_ms <= renew_ms || renew_ms <= retry_ms || retry_ms == 0 || lease_ms < 1000
                );
            }
        }

        #[test]
        fn from_ttl_accepts_every_whole_second_ttl(ttl_secs in 1_u64..3_600) {
            prop_assert!(ElectionTiming::from_ttl(Duration::from_secs(ttl_secs)).is_ok());
        }
    }
}
