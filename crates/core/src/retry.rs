//! Bounded retry-with-backoff policy for failed work units.
//!
//! The default policy never retries: a failed unit is recorded and the run
//! moves on. Operators opt in by raising [`RetryPolicy::max_retries`].

use std::time::Duration;

/// Tunable parameters for retrying a failed unit.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure. `0` disables retries.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failed retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_secs(30),
            max_delay: Duration::from_secs(600),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy allowing `max_retries` retries, other parameters default.
    pub fn with_retries(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            ..Default::default()
        }
    }

    /// Total attempts a unit may receive, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delays to sleep before each retry, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let mut delay = self.initial_delay.min(self.max_delay);
        (0..self.max_retries).map(move |_| {
            let current = delay;
            delay = next_delay(delay, self);
            current
        })
    }
}

/// Calculate the next backoff delay from the current delay and policy.
///
/// The result is clamped to [`RetryPolicy::max_delay`].
pub fn next_delay(current: Duration, policy: &RetryPolicy) -> Duration {
    let next_ms = (current.as_millis() as f64 * policy.multiplier) as u64;
    Duration::from_millis(next_ms).min(policy.max_delay)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
