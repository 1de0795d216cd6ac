//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_lease_store;
mod redis_lease_store;
mod tracing_election_event_recorder;

pub use in_memory_lease_store::InMemoryLeaseStore;
pub use redis_lease_store::RedisLeaseStore;
pub use tracing_election_event_recorder::TracingElectionEventRecorder;
