//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod election;
mod lease;

pub use election::{
    DEFAULT_LEASE_TTL, DEFAULT_MAX_BACKOFF, DEFAULT_NAMESPACE, DEFAULT_START_BACKOFF,
    ElectionConfig, ElectionConfigInput, ElectionEvent, ElectionEventKind, ElectionState,
    ElectionTiming, LeaderSnapshot, RetryStrategy,
};
pub use lease::{LeaseKey, LeaseRecord, LeaseVersion, VersionedLeaseRecord};
