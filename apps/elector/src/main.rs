//! Leaderlease elector runtime.

#![forbid(unsafe_code)]

mod elector_config;
mod status_server;

use std::env;
use std::sync::Arc;

use leaderlease_application::{
    LeaderElector, LeaderNameCallbacks, LeaseStore, ShutdownSignal, ShutdownTrigger,
    shutdown_channel,
};
use leaderlease_core::{AppError, AppResult};
use leaderlease_infrastructure::{
    InMemoryLeaseStore, RedisLeaseStore, TracingElectionEventRecorder,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::elector_config::{ElectorConfig, LeaseStoreBackend};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    if env::args().nth(1).as_deref() == Some("--version") {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    dotenvy::dotenv().ok();
    init_tracing();

    let config = ElectorConfig::load()?;
    let election = config.election_config()?;
    let store = build_lease_store(&config.backend)?;

    let (trigger, shutdown) = shutdown_channel();
    tokio::spawn(forward_termination_signal(trigger));

    let identity = config.candidate_identity.clone();
    let callbacks = LeaderNameCallbacks::new(identity, |name: &str| {
        if name.is_empty() {
            info!("leader unknown");
        } else {
            info!("{name} is the leader");
        }
    });

    let elector = LeaderElector::new(election, store, Arc::new(callbacks))
        .with_event_recorder(Arc::new(TracingElectionEventRecorder::new()));

    let server = match config.http_addr {
        Some(address) => {
            let listener = status_server::bind(address).await?;
            let router = status_server::build_router(elector.status());
            Some(tokio::spawn(status_server::serve(
                listener,
                router,
                shutdown.clone(),
            )))
        }
        None => None,
    };

    let election = elector.config();
    info!(
        election = %election.election_id(),
        identity = %election.candidate_identity(),
        lease = %election.lease_key(),
        lease_duration = ?election.timing().lease_duration(),
        "leaderlease-elector started"
    );

    if config.initial_wait && !initial_wait(&config, &shutdown).await {
        info!("shutdown requested before the election started");
    } else {
        elector.run(shutdown).await;
    }

    if let Some(server) = server {
        server
            .await
            .map_err(|error| AppError::Internal(format!("status server task failed: {error}")))??;
    }

    info!("leaderlease-elector stopped");
    Ok(())
}

/// Sleeps one and a half ttl so a lease held by a previous incarnation
/// lapses. Returns false when shutdown fired first.
async fn initial_wait(config: &ElectorConfig, shutdown: &ShutdownSignal) -> bool {
    let wait = config.initial_wait_duration();
    info!(wait = ?wait, "waiting before the first election attempt");

    tokio::select! {
        biased;
        () = shutdown.triggered() => false,
        () = tokio::time::sleep(wait) => true,
    }
}

fn build_lease_store(backend: &LeaseStoreBackend) -> AppResult<Arc<dyn LeaseStore>> {
    match backend {
        LeaseStoreBackend::Memory => {
            warn!("using the in-memory lease store; candidates in other processes are not seen");
            Ok(Arc::new(InMemoryLeaseStore::new()))
        }
        LeaseStoreBackend::Redis {
            redis_url,
            key_prefix,
        } => {
            let client = redis::Client::open(redis_url.as_str())
                .map_err(|error| AppError::Validation(format!("invalid REDIS_URL: {error}")))?;
            Ok(Arc::new(RedisLeaseStore::new(client, key_prefix.clone())))
        }
    }
}

async fn forward_termination_signal(trigger: ShutdownTrigger) {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(error = %error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("shutdown signal received");
    trigger.trigger();
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
