use async_trait::async_trait;
use leaderlease_core::AppResult;
use leaderlease_domain::{LeaseKey, LeaseRecord, LeaseVersion, VersionedLeaseRecord};

/// Coordination store port holding lease records under optimistic concurrency.
///
/// Adapters must be linearizable per key and must not retry internally; the
/// election loop owns retries. Unreachable stores surface as
/// `AppError::Transport`.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Reads one lease record.
    ///
    /// Returns `AppError::NotFound` when no record exists for the key.
    async fn read(&self, key: &LeaseKey) -> AppResult<VersionedLeaseRecord>;

    /// Creates one lease record.
    ///
    /// Returns `AppError::Conflict` when a record already exists.
    async fn create(&self, key: &LeaseKey, record: &LeaseRecord) -> AppResult<LeaseVersion>;

    /// Replaces one lease record if it is still at `version`.
    ///
    /// Returns `AppError::Conflict` on a stale version and `AppError::NotFound`
    /// when the record disappeared.
    async fn update(
        &self,
        key: &LeaseKey,
        record: &LeaseRecord,
        version: &LeaseVersion,
    ) -> AppResult<LeaseVersion>;
}
