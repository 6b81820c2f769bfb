//! Timing and attempt metrics for a pipeline run.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::ProviderId;

/// Metrics for one provider call, retries included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallMetrics {
    /// Provider called.
    pub provider: ProviderId,
    /// Attempts made (0 when the provider was never called).
    pub attempts: u32,
    /// Wall-clock time across all attempts.
    pub elapsed_ms: u64,
    /// Whether a result came back.
    pub succeeded: bool,
}

impl CallMetrics {
    /// Builds metrics from an elapsed duration.
    #[must_use]
    pub fn new(provider: ProviderId, attempts: u32, elapsed: Duration, succeeded: bool) -> Self {
        Self {
            provider,
            attempts,
            elapsed_ms: millis(elapsed),
            succeeded,
        }
    }
}

/// Metrics for a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Primary call.
    pub primary: CallMetrics,
    /// Validator calls in configuration order.
    pub validators: Vec<CallMetrics>,
    /// Wall-clock time of the run.
    pub wall_time_ms: u64,
}

impl RunMetrics {
    /// Total attempts across every call.
    #[must_use]
    pub fn total_attempts(&self) -> u32 {
        self.primary.attempts + self.validators.iter().map(|v| v.attempts).sum::<u32>()
    }
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_attempts() {
        let metrics = RunMetrics {
            primary: CallMetrics::new(ProviderId::document_intelligence(), 2, Duration::from_millis(1500), true),
            validators: vec![
                CallMetrics::new(ProviderId::openai(), 1, Duration::from_millis(900), true),
                CallMetrics::new(ProviderId::gemini(), 3, Duration::from_secs(4), false),
            ],
            wall_time_ms: 5500,
        };
        assert_eq!(metrics.total_attempts(), 6);
        assert_eq!(metrics.primary.elapsed_ms, 1500);
    }
}
