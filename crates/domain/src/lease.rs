use std::fmt::{Display, Formatter};
use std::time::Duration;

use chrono::{DateTime, Utc};
use leaderlease_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Namespaced name addressing one lease record in the coordination store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseKey {
    namespace: NonEmptyString,
    name: NonEmptyString,
}

impl LeaseKey {
    /// Creates a validated lease key.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            namespace: NonEmptyString::new(namespace)?,
            name: NonEmptyString::new(name)?,
        })
    }

    /// Returns the lease namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    /// Returns the lease name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}

impl Display for LeaseKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}/{}", self.namespace, self.name)
    }
}

/// Opaque optimistic-concurrency token issued by the coordination store.
///
/// Callers never interpret the value; they only hand back the token they
/// last read so the store can reject writes based on stale state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseVersion(String);

impl LeaseVersion {
    /// Wraps a store-issued token.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for LeaseVersion {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Lease contents as persisted by the coordination store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRecord {
    /// Current holder identity, empty when the lease is vacant.
    pub holder_identity: String,
    /// Lease duration declared by the holder.
    pub lease_duration_seconds: u32,
    /// When the current holder acquired the lease.
    pub acquire_time: DateTime<Utc>,
    /// When the current holder last renewed the lease.
    pub renew_time: DateTime<Utc>,
    /// Number of holder changes over the lifetime of the record.
    pub leader_transitions: u32,
}

impl LeaseRecord {
    /// Returns true when nobody holds the lease.
    #[must_use]
    pub fn is_vacant(&self) -> bool {
        self.holder_identity.trim().is_empty()
    }

    /// Returns true when the given identity holds the lease.
    #[must_use]
    pub fn is_held_by(&self, identity: &str) -> bool {
        !self.is_vacant() && self.holder_identity == identity
    }

    /// Returns the declared lease duration.
    #[must_use]
    pub fn lease_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.lease_duration_seconds))
    }
}

/// Lease record together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedLeaseRecord {
    /// Record contents.
    pub record: LeaseRecord,
    /// Version token to present on the next write.
    pub version: LeaseVersion,
}
