//! Retry policy implementation.

use keel_config::RetryConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Linear retry policy: after failed attempt `n` the caller waits
/// `n * step_delay`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub step_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::lock_contention()
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn linear(max_attempts: u32, step_delay: Duration) -> Self {
        Self {
            max_attempts,
            step_delay,
        }
    }

    /// The policy applied to single-record writes that hit a locked
    /// database: 5 attempts, 200ms linear steps.
    #[must_use]
    pub fn lock_contention() -> Self {
        Self::from_config(&RetryConfig::default())
    }

    /// Builds the lock-contention policy from configuration.
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::linear(config.max_attempts, config.step_delay())
    }

    /// Calculates the delay to wait after the given failed attempt
    /// (1-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.step_delay.saturating_mul(attempt)
    }

    /// Returns `true` if another attempt is allowed after `attempt` failed
    /// attempts and the failure is retryable.
    #[must_use]
    pub fn should_retry(&self, attempt: u32, retryable: bool) -> bool {
        retryable && attempt < self.max_attempts
    }

    /// Executes `f` until it succeeds, fails with an error `is_retryable`
    /// rejects, or the attempts run out. `f` receives the 1-based attempt
    /// number.
    pub async fn execute_if<F, Fut, T, E, P>(&self, mut f: F, is_retryable: P) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            match f(attempt).await {
                Ok(result) => return Ok(result),
                Err(e) if self.should_retry(attempt, is_retryable(&e)) => {
                    let delay = self.delay_for_attempt(attempt);
                    debug!("Attempt {} failed: {}; retrying in {:?}", attempt, e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt > 1 {
                        warn!("Giving up after {} attempts: {}", attempt, e);
                    }
                    return Err(e);
                }
            }
        }
    }
}
