//! Application services and ports.

#![forbid(unsafe_code)]

mod election_ports;
mod election_service;
mod shutdown;

pub use election_ports::{
    ElectionEventRecorder, LeaderCallbacks, LeaderNameCallbacks, LeaderWork, LeaseStore,
};
pub use election_service::{LeaderElector, LeaderStatusReader};
pub use shutdown::{ShutdownSignal, ShutdownTrigger, shutdown_channel};
