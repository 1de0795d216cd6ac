use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use leaderlease_core::{AppError, AppResult};
use leaderlease_domain::{
    DEFAULT_LEASE_TTL, DEFAULT_NAMESPACE, ElectionConfig, ElectionConfigInput, ElectionTiming,
    RetryStrategy,
};

const DEFAULT_KEY_PREFIX: &str = "leaderlease";

/// Coordination store selected for this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseStoreBackend {
    Memory,
    Redis { redis_url: String, key_prefix: String },
}

/// Runtime configuration of the elector binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectorConfig {
    pub election_name: String,
    pub candidate_identity: String,
    pub namespace: String,
    pub ttl: Duration,
    pub release_on_cancel: bool,
    pub retry_strategy: RetryStrategy,
    pub initial_wait: bool,
    pub http_addr: Option<SocketAddr>,
    pub backend: LeaseStoreBackend,
}

impl ElectorConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(&|name| env::var(name).ok())
    }

    fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> AppResult<Self> {
        let election_name = required_env(lookup, "ELECTION_NAME")?;
        let candidate_identity = required_env(lookup, "ELECTION_ID")?;
        let namespace =
            lookup("ELECTION_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned());
        let ttl = Duration::from_secs(parse_env_u64(
            lookup,
            "ELECTION_TTL_SECONDS",
            DEFAULT_LEASE_TTL.as_secs(),
        )?);
        let release_on_cancel = parse_env_bool(lookup, "ELECTION_RELEASE_ON_CANCEL", true)?;
        let initial_wait = parse_env_bool(lookup, "ELECTION_INITIAL_WAIT", false)?;

        let retry_strategy = match lookup("ELECTION_RETRY_STRATEGY")
            .unwrap_or_else(|| "fixed".to_owned())
            .to_ascii_lowercase()
            .as_str()
        {
            "fixed" => RetryStrategy::Fixed,
            "exponential" => RetryStrategy::exponential(),
            other => {
                return Err(AppError::Validation(format!(
                    "ELECTION_RETRY_STRATEGY must be 'fixed' or 'exponential', got '{other}'"
                )));
            }
        };

        let http_addr = lookup("ELECTION_HTTP_ADDR")
            .filter(|value| !value.trim().is_empty())
            .map(|value| {
                value.parse::<SocketAddr>().map_err(|error| {
                    AppError::Validation(format!("invalid ELECTION_HTTP_ADDR '{value}': {error}"))
                })
            })
            .transpose()?;

        let backend = match lookup("LEASE_STORE_BACKEND")
            .unwrap_or_else(|| "memory".to_owned())
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => LeaseStoreBackend::Memory,
            "redis" => LeaseStoreBackend::Redis {
                redis_url: required_env(lookup, "REDIS_URL")?,
                key_prefix: lookup("LEASE_KEY_PREFIX")
                    .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_owned()),
            },
            other => {
                return Err(AppError::Validation(format!(
                    "LEASE_STORE_BACKEND must be 'memory' or 'redis', got '{other}'"
                )));
            }
        };

        Ok(Self {
            election_name,
            candidate_identity,
            namespace,
            ttl,
            release_on_cancel,
            retry_strategy,
            initial_wait,
            http_addr,
            backend,
        })
    }

    /// Builds the validated election configuration.
    pub fn election_config(&self) -> AppResult<ElectionConfig> {
        ElectionConfig::new(ElectionConfigInput {
            election_id: self.election_name.clone(),
            candidate_identity: self.candidate_identity.clone(),
            namespace: self.namespace.clone(),
            timing: ElectionTiming::from_ttl(self.ttl)?,
            release_on_cancel: self.release_on_cancel,
            retry_strategy: self.retry_strategy,
        })
    }

    /// Time to wait before the first attempt so a previous holder's lease
    /// can lapse.
    pub fn initial_wait_duration(&self) -> Duration {
        self.ttl + self.ttl / 2
    }
}

fn required_env(lookup: &dyn Fn(&str) -> Option<String>, name: &str) -> AppResult<String> {
    let value = lookup(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parse_env_u64(
    lookup: &dyn Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> AppResult<u64> {
    match lookup(name) {
        Some(value) => value
            .parse::<u64>()
            .map_err(|error| AppError::Validation(format!("invalid {name} '{value}': {error}"))),
        None => Ok(default),
    }
}

fn parse_env_bool(
    lookup: &dyn Fn(&str) -> Option<String>,
    name: &str,
    default: bool,
) -> AppResult<bool> {
    match lookup(name) {
        Some(value) if value.eq_ignore_ascii_case("true") => Ok(true),
        Some(value) if value.eq_ignore_ascii_case("false") => Ok(false),
        Some(value) => Err(AppError::Validation(format!(
            "{name} must be 'true' or 'false', got '{value}'"
        ))),
        None => Ok(default),
    }
}
