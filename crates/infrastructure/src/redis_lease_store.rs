//! Redis-backed lease store.
//!
//! Each lease is one hash holding an integer `version` and the JSON encoded
//! `record`. Writes go through Lua scripts so the version check and the
//! write are atomic. Keys carry no Redis TTL; expiry is decided by the
//! candidates from the record itself.

use async_trait::async_trait;
use leaderlease_application::LeaseStore;
use leaderlease_core::{AppError, AppResult};
use leaderlease_domain::{LeaseKey, LeaseRecord, LeaseVersion, VersionedLeaseRecord};
use redis::Script;

const CREATE_LEASE_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return 0
end
redis.call('HSET', KEYS[1], 'version', 1, 'record', ARGV[1])
return 1
"#;

const UPDATE_LEASE_SCRIPT: &str = r#"
local current = redis.call('HGET', KEYS[1], 'version')
if not current then
  return -1
end
if current ~= ARGV[1] then
  return 0
end
local next_version = redis.call('HINCRBY', KEYS[1], 'version', 1)
redis.call('HSET', KEYS[1], 'record', ARGV[2])
return next_version
"#;

/// Redis implementation of the lease store port.
#[derive(Clone)]
pub struct RedisLeaseStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisLeaseStore {
    /// Creates one lease store adapter.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, key: &LeaseKey) -> String {
        format!("{}:{}:{}", self.key_prefix, key.namespace(), key.name())
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Transport(format!("failed to connect to redis: {error}")))
    }
}

fn encode_record(record: &LeaseRecord) -> AppResult<String> {
    serde_json::to_string(record)
        .map_err(|error| AppError::Internal(format!("failed to encode lease record: {error}")))
}

fn decode_record(key: &LeaseKey, payload: &str) -> AppResult<LeaseRecord> {
    serde_json::from_str(payload).map_err(|error| {
        AppError::Internal(format!("failed to decode lease record '{key}': {error}"))
    })
}

fn decode_stored(
    key: &LeaseKey,
    version: Option<String>,
    payload: Option<String>,
) -> AppResult<VersionedLeaseRecord> {
    match (version, payload) {
        (Some(version), Some(payload)) => Ok(VersionedLeaseRecord {
            record: decode_record(key, payload.as_str())?,
            version: LeaseVersion::new(version),
        }),
        (None, None) => Err(AppError::NotFound(format!("lease '{key}' does not exist"))),
        _ => Err(AppError::Internal(format!(
            "lease '{key}' is missing its version or record field"
        ))),
    }
}

#[async_trait]
impl LeaseStore for RedisLeaseStore {
    async fn read(&self, key: &LeaseKey) -> AppResult<VersionedLeaseRecord> {
        let redis_key = self.key_for(key);
        let mut connection = self.connection().await?;

        let (version, payload): (Option<String>, Option<String>) = redis::cmd("HMGET")
            .arg(redis_key.as_str())
            .arg("version")
            .arg("record")
            .query_async(&mut connection)
            .await
            .map_err(|error| {
                AppError::Transport(format!("failed to read lease '{key}': {error}"))
            })?;

        decode_stored(key, version, payload)
    }

    async fn create(&self, key: &LeaseKey, record: &LeaseRecord) -> AppResult<LeaseVersion> {
        let payload = encode_record(record)?;
        let script = Script::new(CREATE_LEASE_SCRIPT);
        let mut connection = self.connection().await?;

        let created = script
            .key(self.key_for(key))
            .arg(payload)
            .invoke_async::<i64>(&mut connection)
            .await
            .map_err(|error| {
                AppError::Transport(format!("failed to create lease '{key}': {error}"))
            })?;

        if created == 0 {
            return Err(AppError::Conflict(format!("lease '{key}' already exists")));
        }

        Ok(LeaseVersion::new("1"))
    }

    async fn update(
        &self,
        key: &LeaseKey,
        record: &LeaseRecord,
        version: &LeaseVersion,
    ) -> AppResult<LeaseVersion> {
        let payload = encode_record(record)?;
        let script = Script::new(UPDATE_LEASE_SCRIPT);
        let mut connection = self.connection().await?;

        let next_version = script
            .key(self.key_for(key))
            .arg(version.as_str())
            .arg(payload)
            .invoke_async::<i64>(&mut connection)
            .await
            .map_err(|error| {
                AppError::Transport(format!("failed to update lease '{key}': {error}"))
            })?;

        match next_version {
            -1 => Err(AppError::NotFound(format!("lease '{key}' does not exist"))),
            0 => Err(AppError::Conflict(format!(
                "lease '{key}' was modified after version '{version}'"
            ))),
            next_version => Ok(LeaseVersion::new(next_version.to_string())),
        }
    }
}
