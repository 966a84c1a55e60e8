// Retry controller with exponential backoff and cancellation
// Author: kelexine (https://github.com/kelexine)

use crate::error::EventForgeError;
use crate::metrics;
use crate::provider::ProviderError;
use backoff::{backoff::Backoff, ExponentialBackoff};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Bounds for retrying one outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Values below 1 act as 1.
    pub max_attempts: u32,
    /// Wait before the first retry; doubles for each further retry.
    pub base_delay: Duration,
    /// Cap for any single wait, jitter included.
    pub max_delay: Duration,
    /// Jitter adds up to `delay * jitter_ratio` on top of the schedule.
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter_ratio: 0.3,
        }
    }
}

impl RetryPolicy {
    /// Pre-jitter delay schedule: base, 2×base, 4×base, ... capped at max.
    pub fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.base_delay,
            initial_interval: self.base_delay,
            randomization_factor: 0.0, // jitter is added on top, never subtracted
            multiplier: 2.0,
            max_interval: self.max_delay,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    fn with_jitter(&self, delay: Duration) -> Duration {
        if !self.jitter_ratio.is_finite() || self.jitter_ratio <= 0.0 || delay.is_zero() {
            return delay;
        }
        let extra = rand::thread_rng().gen_range(0.0..self.jitter_ratio);
        (delay + delay.mul_f64(extra)).min(self.max_delay.max(delay))
    }
}

/// A successful call plus what it took to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
    pub waited: Duration,
}

/// A call that did not succeed.
///
/// `error` is one of `TerminalProvider`, `RetriesExhausted` or `Cancelled`.
#[derive(Debug)]
pub struct RetryFailure {
    pub error: EventForgeError,
    pub attempts: u32,
    pub waited: Duration,
}

/// Wraps a single outbound call with bounded retries.
#[derive(Debug, Clone, Default)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `operation`, retrying transient provider errors.
    ///
    /// - Terminal errors return immediately without a retry.
    /// - A provider `retry_after` hint can lengthen a wait, never shorten it
    ///   below the exponential schedule.
    /// - Cancelling `cancel` during a wait abandons it and returns
    ///   `Cancelled` without another attempt.
    pub async fn execute<F, Fut, T>(
        &self,
        operation_name: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<Attempted<T>, RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut schedule = self.policy.schedule();
        let mut attempts = 0;
        let mut waited = Duration::ZERO;

        loop {
            attempts += 1;

            let error = match operation().await {
                Ok(value) => {
                    if attempts > 1 {
                        debug!("{} succeeded on attempt {}", operation_name, attempts);
                    }
                    return Ok(Attempted {
                        value,
                        attempts,
                        waited,
                    });
                }
                Err(error) => error,
            };

            if !error.is_transient() {
                debug!(
                    "{} failed with terminal {} on attempt {}",
                    operation_name, error.kind, attempts
                );
                return Err(RetryFailure {
                    error: EventForgeError::TerminalProvider(error),
                    attempts,
                    waited,
                });
            }

            if attempts >= max_attempts {
                warn!(
                    "{}: max attempts ({}) exhausted: {}",
                    operation_name, max_attempts, error
                );
                return Err(RetryFailure {
                    error: EventForgeError::RetriesExhausted {
                        attempts,
                        last: error,
                    },
                    attempts,
                    waited,
                });
            }

            let scheduled = schedule.next_backoff().unwrap_or(self.policy.max_delay);
            let computed = self.policy.with_jitter(scheduled);
            let delay = match error.retry_after {
                Some(hint) => hint.max(computed).min(self.policy.max_delay.max(computed)),
                None => computed,
            };

            warn!(
                "{} failed with {} (attempt {}), retrying after {}ms",
                operation_name,
                error.kind,
                attempts,
                delay.as_millis()
            );
            metrics::record_retry(error.kind.as_str());

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("{} cancelled while waiting to retry", operation_name);
                    return Err(RetryFailure {
                        error: EventForgeError::Cancelled { attempts },
                        attempts,
                        waited,
                    });
                }
                _ = tokio::time::sleep(delay) => {
                    waited += delay;
                }
            }
        }
    }
}
