use std::collections::HashMap;

use async_trait::async_trait;
use leaderlease_application::LeaseStore;
use leaderlease_core::{AppError, AppResult};
use leaderlease_domain::{LeaseKey, LeaseRecord, LeaseVersion, VersionedLeaseRecord};
use tokio::sync::RwLock;

/// In-process lease store for single-process deployments and tests.
///
/// Candidates sharing one instance through an `Arc` elect among themselves.
#[derive(Default)]
pub struct InMemoryLeaseStore {
    records: RwLock<HashMap<LeaseKey, VersionedLeaseRecord>>,
}

impl InMemoryLeaseStore {
    /// Creates an empty in-memory lease store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn new_version() -> LeaseVersion {
    LeaseVersion::new(uuid::Uuid::new_v4().to_string())
}

#[async_trait]
impl LeaseStore for InMemoryLeaseStore {
    async fn read(&self, key: &LeaseKey) -> AppResult<VersionedLeaseRecord> {
        self.records
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("lease '{key}' does not exist")))
    }

    async fn create(&self, key: &LeaseKey, record: &LeaseRecord) -> AppResult<LeaseVersion> {
        let mut records = self.records.write().await;
        if records.contains_key(key) {
            return Err(AppError::Conflict(format!("lease '{key}' already exists")));
        }

        let version = new_version();
        records.insert(
            key.clone(),
            VersionedLeaseRecord {
                record: record.clone(),
                version: version.clone(),
            },
        );

        Ok(version)
    }

    async fn update(
        &self,
        key: &LeaseKey,
        record: &LeaseRecord,
        version: &LeaseVersion,
    ) -> AppResult<LeaseVersion> {
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(key)
            .ok_or_else(|| AppError::NotFound(format!("lease '{key}' does not exist")))?;

        if stored.version != *version {
            return Err(AppError::Conflict(format!(
                "lease '{key}' was modified after version '{version}'"
            )));
        }

        let next_version = new_version();
        *stored = VersionedLeaseRecord {
            record: record.clone(),
            version: next_version.clone(),
        };

        Ok(next_version)
    }
}
