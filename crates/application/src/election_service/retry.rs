use std::time::Duration;

use leaderlease_domain::RetryStrategy;

/// Wait sequence between failed acquisition attempts.
#[derive(Debug, Clone)]
pub(super) struct RetryBackoff {
    strategy: RetryStrategy,
    retry_period: Duration,
    next_exponential: Option<Duration>,
}

impl RetryBackoff {
    pub(super) fn new(strategy: RetryStrategy, retry_period: Duration) -> Self {
        Self {
            strategy,
            retry_period,
            next_exponential: None,
        }
    }

    /// Returns the wait before the next acquisition attempt.
    pub(super) fn next_wait(&mut self) -> Duration {
        match self.strategy {
            RetryStrategy::Fixed => self.retry_period,
            RetryStrategy::Exponential { start, max } => {
                let wait = self.next_exponential.unwrap_or(start).min(max);
                self.next_exponential = Some(wait.saturating_mul(2).min(max));
                wait
            }
        }
    }

    pub(super) fn reset(&mut self) {
        self.next_exponential = None;
    }
}
