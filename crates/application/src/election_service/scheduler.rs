use std::time::Duration;

use leaderlease_domain::ElectionState;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::shutdown::{ShutdownSignal, shutdown_channel};

use super::retry::RetryBackoff;
use super::state_machine::AttemptOutcome;
use super::{ActiveLeaderWork, LeaderElector};

impl LeaderElector {
    /// Runs the election until `shutdown` fires.
    ///
    /// While not leading the lease is polled with the configured retry
    /// strategy; while leading it is renewed every retry period. Leadership
    /// ends locally once no renewal succeeded within the renew deadline. On
    /// shutdown a leading candidate stops its leader work, reports the
    /// step-down and, when configured, vacates the lease before returning.
    pub async fn run(mut self, shutdown: ShutdownSignal) {
        let timing = self.machine.config().timing();
        let mut backoff = RetryBackoff::new(
            self.machine.config().retry_strategy(),
            timing.retry_period(),
        );

        info!(
            lease = %self.machine.config().lease_key(),
            identity = %self.machine.config().candidate_identity(),
            lease_duration = ?timing.lease_duration(),
            renew_deadline = ?timing.renew_deadline(),
            retry_period = ?timing.retry_period(),
            "leader election started"
        );
        self.publish_status();

        loop {
            if shutdown.is_triggered() {
                break;
            }

            let wait = if self.machine.is_leader() {
                self.renew_step().await
            } else {
                self.acquire_step(&mut backoff).await
            };

            if pause(wait, &shutdown).await {
                break;
            }
        }

        self.shut_down().await;
    }

    async fn acquire_step(&mut self, backoff: &mut RetryBackoff) -> Duration {
        let retry_period = self.machine.config().timing().retry_period();
        self.machine.set_state(ElectionState::Acquiring);
        self.publish_status();

        match self.machine.try_acquire_or_renew(retry_period).await {
            Ok(AttemptOutcome::Holding) => {
                self.machine.set_state(ElectionState::Leading);
                self.report_observed_holder().await;
                info!(
                    lease = %self.machine.config().lease_key(),
                    identity = %self.machine.config().candidate_identity(),
                    leader_transitions = self.machine.observed_transitions(),
                    "acquired lease"
                );
                self.dispatcher.started_leading().await;
                self.start_leader_work();
                backoff.reset();
                self.publish_status();
                retry_period
            }
            Ok(AttemptOutcome::HeldByOther(holder)) => {
                self.machine.set_state(ElectionState::NotLeader);
                debug!(
                    lease = %self.machine.config().lease_key(),
                    leader = %holder,
                    "lease held by another candidate"
                );
                self.report_observed_holder().await;
                self.publish_status();
                backoff.next_wait()
            }
            Err(error) => {
                self.machine.set_state(ElectionState::NotLeader);
                if error.is_transport() {
                    warn!(
                        lease = %self.machine.config().lease_key(),
                        identity = %self.machine.config().candidate_identity(),
                        error = %error,
                        "failed to reach lease store"
                    );
                } else {
                    debug!(
                        lease = %self.machine.config().lease_key(),
                        error = %error,
                        "lease acquisition rejected"
                    );
                    self.report_observed_holder().await;
                    self.report_race_winner(retry_period).await;
                }
                self.publish_status();
                backoff.next_wait()
            }
        }
    }

    async fn renew_step(&mut self) -> Duration {
        let retry_period = self.machine.config().timing().retry_period();
        let Some(deadline) = self.machine.renew_deadline_at() else {
            self.step_down("no successful renewal recorded").await;
            return retry_period;
        };

        let now = Instant::now();
        if now >= deadline {
            self.step_down("renew deadline exceeded").await;
            return retry_period;
        }

        match self
            .machine
            .try_acquire_or_renew(retry_period.min(deadline - now))
            .await
        {
            Ok(AttemptOutcome::Holding) => {
                debug!(
                    lease = %self.machine.config().lease_key(),
                    identity = %self.machine.config().candidate_identity(),
                    "renewed lease"
                );
                self.publish_status();
                retry_period
            }
            Ok(AttemptOutcome::HeldByOther(_)) => {
                self.step_down("lease held by another candidate").await;
                self.report_observed_holder().await;
                self.publish_status();
                retry_period
            }
            Err(error) if error.is_transport() => {
                warn!(
                    lease = %self.machine.config().lease_key(),
                    identity = %self.machine.config().candidate_identity(),
                    error = %error,
                    "failed to renew lease"
                );
                let now = Instant::now();
                if now >= deadline {
                    self.step_down("renew deadline exceeded").await;
                    retry_period
                } else {
                    retry_period.min(deadline - now)
                }
            }
            Err(error) => {
                warn!(
                    lease = %self.machine.config().lease_key(),
                    identity = %self.machine.config().candidate_identity(),
                    error = %error,
                    "lease renewal rejected"
                );
                self.step_down("lease renewal rejected").await;
                self.report_observed_holder().await;
                self.publish_status();
                retry_period
            }
        }
    }

    async fn step_down(&mut self, reason: &str) {
        warn!(
            lease = %self.machine.config().lease_key(),
            identity = %self.machine.config().candidate_identity(),
            reason,
            "stepping down"
        );
        self.machine.set_state(ElectionState::NotLeader);
        self.stop_leader_work().await;
        self.dispatcher.stopped_leading().await;
        self.publish_status();
    }

    async fn shut_down(&mut self) {
        let timing = self.machine.config().timing();

        if self.machine.is_leader() {
            self.machine.set_state(ElectionState::Releasing);
            self.publish_status();
            self.stop_leader_work().await;
            self.dispatcher.stopped_leading().await;

            if self.machine.config().release_on_cancel() {
                match self.machine.release(timing.retry_period()).await {
                    Ok(true) => {
                        info!(
                            lease = %self.machine.config().lease_key(),
                            identity = %self.machine.config().candidate_identity(),
                            "released lease"
                        );
                        self.dispatcher.released().await;
                    }
                    Ok(false) => debug!(
                        lease = %self.machine.config().lease_key(),
                        "lease no longer held, nothing to release"
                    ),
                    Err(error) => warn!(
                        lease = %self.machine.config().lease_key(),
                        identity = %self.machine.config().candidate_identity(),
                        error = %error,
                        "failed to release lease, it will expire"
                    ),
                }
            }
        }

        self.stop_leader_work().await;
        self.machine.set_state(ElectionState::Stopped);
        self.publish_status();
        info!(
            lease = %self.machine.config().lease_key(),
            identity = %self.machine.config().candidate_identity(),
            "leader election stopped"
        );
    }

    /// Reports who won after a claim lost its write race.
    async fn report_race_winner(&mut self, call_timeout: Duration) {
        match self.machine.refresh(call_timeout).await {
            Ok(()) => self.report_observed_holder().await,
            Err(error) => debug!(
                lease = %self.machine.config().lease_key(),
                error = %error,
                "failed to re-read lease after losing a write race"
            ),
        }
    }

    async fn report_observed_holder(&mut self) {
        let holder = self.machine.observed_holder().to_owned();
        self.dispatcher.observed_leader(holder.as_str()).await;
    }

    fn start_leader_work(&mut self) {
        let Some(work) = self.work.clone() else {
            return;
        };

        let (stop, signal) = shutdown_channel();
        let identity = self
            .machine
            .config()
            .candidate_identity()
            .as_str()
            .to_owned();
        let handle = tokio::spawn(async move { work.run(identity, signal).await });
        self.active_work = Some(ActiveLeaderWork { stop, handle });
    }

    async fn stop_leader_work(&mut self) {
        let Some(active) = self.active_work.take() else {
            return;
        };

        active.stop.trigger();
        if let Err(error) = active.handle.await {
            warn!(
                lease = %self.machine.config().lease_key(),
                error = %error,
                "leader work ended abnormally"
            );
        }
    }
}

/// Sleeps for `wait` unless shutdown fires first. Returns true on shutdown.
async fn pause(wait: Duration, shutdown: &ShutdownSignal) -> bool {
    tokio::select! {
        biased;
        () = shutdown.triggered() => true,
        () = tokio::time::sleep(wait) => false,
    }
}
