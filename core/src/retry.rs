//! Bounded retries with exponential backoff for provider calls.
//!
//! Only [`ProviderError::Transient`] failures are retried. Each attempt runs
//! under its own timeout, and an elapsed timeout counts as a transient failure.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::provider::ProviderError;
use crate::types::ProviderId;

/// Retry behavior for a single provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts including the first (default: 3, minimum 1).
    pub max_attempts: u32,
    /// Delay before the second attempt (default: 500ms).
    pub base_delay: Duration,
    /// Upper bound for any single delay (default: 30s).
    pub max_delay: Duration,
    /// Timeout applied to each attempt (default: 60s).
    pub attempt_timeout: Duration,
    /// Adds up to half the computed delay as random jitter (default: true).
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            attempt_timeout: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Set the maximum number of attempts.
    #[must_use]
    pub const fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// Set the base backoff delay.
    #[must_use]
    pub const fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the backoff ceiling.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub const fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Enable or disable jitter.
    #[must_use]
    pub const fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Backoff before attempt `attempt + 1`, without jitter.
    ///
    /// `attempt` is the 1-based number of the attempt that just failed.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay)
    }

    /// Delay actually slept after a failed attempt.
    ///
    /// A server-provided `Retry-After` wins over computed backoff, still capped
    /// by `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint.min(self.max_delay);
        }
        let delay = self.backoff(attempt);
        if self.jitter {
            (delay + jitter(delay / 2)).min(self.max_delay)
        } else {
            delay
        }
    }
}

/// Parses a `Retry-After` header value given as delta-seconds.
///
/// HTTP-date values and anything that is not a non-negative integer are
/// ignored.
#[must_use]
pub fn parse_retry_after(raw: &str) -> Option<Duration> {
    raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn jitter(bound: Duration) -> Duration {
    let nanos = u64::try_from(bound.as_nanos()).unwrap_or(u64::MAX);
    if nanos == 0 {
        return Duration::ZERO;
    }
    #[allow(clippy::cast_possible_truncation)]
    let sample = uuid::Uuid::new_v4().as_u128() as u64;
    Duration::from_nanos(sample % nanos)
}

/// Successful outcome with the number of attempts it took.
#[derive(Debug, Clone)]
pub struct Retried<T> {
    /// Value produced by the successful attempt.
    pub value: T,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

/// Final failure after the retry controller gave up.
#[derive(Debug, Clone, Error)]
#[error("{error} (after {attempts} attempt(s))")]
pub struct RetryError {
    /// The last error observed.
    #[source]
    pub error: ProviderError,
    /// Attempts made.
    pub attempts: u32,
    /// `true` when the last error was transient and the budget ran out.
    pub retries_exhausted: bool,
}

/// Runs `operation` until it succeeds, fails permanently, or the budget runs out.
///
/// # Errors
///
/// Returns a [`RetryError`] carrying the last provider error.
pub async fn with_retry<T, F, Fut>(
    provider: &ProviderId,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<Retried<T>, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let start = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let outcome = match tokio::time::timeout(policy.attempt_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(provider.clone(), policy.attempt_timeout)),
        };

        let error = match outcome {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(
                        provider = %provider,
                        attempt,
                        elapsed_ms = start.elapsed().as_millis(),
                        "Provider call succeeded after retry"
                    );
                }
                return Ok(Retried { value, attempts: attempt });
            }
            Err(error) => error,
        };

        if !error.is_transient() {
            tracing::warn!(provider = %provider, attempt, error = %error, "Permanent provider failure");
            return Err(RetryError {
                error,
                attempts: attempt,
                retries_exhausted: false,
            });
        }

        if attempt >= max_attempts {
            tracing::warn!(
                provider = %provider,
                attempts = attempt,
                error = %error,
                "Retries exhausted"
            );
            return Err(RetryError {
                error,
                attempts: attempt,
                retries_exhausted: true,
            });
        }

        let delay = policy.delay_for(attempt, error.retry_after());
        tracing::warn!(
            provider = %provider,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis(),
            error = %error,
            "Transient provider failure, backing off"
        );
        tokio::time::sleep(delay).await;
    }
}
