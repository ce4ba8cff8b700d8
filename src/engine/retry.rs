// ABOUTME: Retry policy configuration and backoff delay calculation
// ABOUTME: Computes exponential backoff with an optional jitter factor, capped at a maximum

use rand::Rng;
use std::time::Duration;

/// Immutable retry configuration. Absence of a policy on a task means the
/// first failure is terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create a retry policy with exponential backoff and jitter enabled.
    pub fn exponential_backoff(
        max_retries: u32,
        initial_delay: Duration,
        backoff_factor: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_delay,
            backoff_factor,
            ..Self::default()
        }
    }

    /// Create a retry policy that waits the same amount of time between
    /// every attempt.
    pub fn fixed_delay(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay: delay,
            max_delay: delay,
            backoff_factor: 1.0,
            jitter: false,
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Calculate the delay before the retry following the given 0-indexed
    /// attempt. The result is capped at `max_delay` even after jitter is
    /// applied.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let mut delay = base.min(self.max_delay.as_secs_f64());

        if self.jitter {
            // Uniform jitter in [0.8, 1.2)
            delay *= rand::rng().random_range(0.8..1.2);
        }

        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()).max(0.0))
    }
}
