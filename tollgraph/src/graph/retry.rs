//! Retry policy for node execution.
//!
//! Only errors for which `AgentError::is_retryable` holds are retried, so a
//! transient gateway failure re-runs `think` while tool side effects in `act`
//! are never repeated.

use std::time::Duration;

/// How many times, and with what delay, to re-run a failed node.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RetryPolicy {
    #[default]
    None,
    Fixed {
        max_attempts: usize,
        interval: Duration,
    },
    Exponential {
        max_attempts: usize,
        initial_interval: Duration,
        /// Cap for a single delay.
        max_interval: Duration,
        multiplier: f64,
    },
}

impl RetryPolicy {
    pub fn none() -> Self {
        RetryPolicy::None
    }

    pub fn fixed(max_attempts: usize, interval: Duration) -> Self {
        RetryPolicy::Fixed {
            max_attempts,
            interval,
        }
    }

    pub fn exponential(
        max_attempts: usize,
        initial_interval: Duration,
        max_interval: Duration,
        multiplier: f64,
    ) -> Self {
        RetryPolicy::Exponential {
            max_attempts,
            initial_interval,
            max_interval,
            multiplier,
        }
    }

    /// Returns `true` if `attempt` (0-based count of retries done) is below the maximum.
    pub fn should_retry(&self, attempt: usize) -> bool {
        match self {
            RetryPolicy::None => false,
            RetryPolicy::Fixed { max_attempts, .. } => attempt < *max_attempts,
            RetryPolicy::Exponential { max_attempts, .. } => attempt < *max_attempts,
        }
    }

    /// Delay before retry number `attempt`.
    pub fn delay(&self, attempt: usize) -> Duration {
        match self {
            RetryPolicy::None => Duration::ZERO,
            RetryPolicy::Fixed { interval, .. } => *interval,
            RetryPolicy::Exponential {
                initial_interval,
                max_interval,
                multiplier,
                ..
            } => {
                let secs = initial_interval.as_secs_f64() * multiplier.powi(attempt as i32);
                Duration::from_secs_f64(secs).min(*max_interval)
            }
        }
    }
}
