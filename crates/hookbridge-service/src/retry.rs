//! # Retry Policy
//!
//! Exponential backoff for transient sink delivery failures, with jitter to
//! spread concurrent retries.

use rand::Rng;
use std::time::Duration;

/// Retry policy configuration for exponential backoff
///
/// `max_attempts` counts total delivery attempts, including the first.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total delivery attempts
    pub max_attempts: u32,

    /// Delay after the first failed attempt
    pub initial_delay: Duration,

    /// Maximum delay between attempts
    pub max_delay: Duration,

    /// Exponential backoff multiplier
    pub backoff_multiplier: f64,

    /// Whether to add jitter to delays
    pub use_jitter: bool,

    /// Jitter range as a fraction of the delay (0.25 = ±25%)
    pub jitter_percent: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            use_jitter: true,
            jitter_percent: 0.25,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt budget, keeping the default
    /// backoff curve
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Disable jitter (deterministic delays, used in tests)
    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Delay to wait after the given failed attempt (1-based)
    ///
    /// The first failed attempt waits `initial_delay`, each subsequent one
    /// multiplies by `backoff_multiplier` up to `max_delay`.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let base_secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let capped_secs = base_secs.min(self.max_delay.as_secs_f64());

        let final_secs = if self.use_jitter {
            add_jitter(capped_secs, self.jitter_percent)
        } else {
            capped_secs
        };

        Duration::from_secs_f64(final_secs)
    }

    /// True when another attempt is allowed after `attempt` (1-based) failed
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Apply random variation in `[delay * (1-jitter), delay * (1+jitter)]`
fn add_jitter(delay_secs: f64, jitter_percent: f64) -> f64 {
    let jitter_range = delay_secs * jitter_percent;
    if jitter_range <= 0.0 {
        return delay_secs;
    }

    let mut rng = rand::thread_rng();
    let jitter = rng.gen_range(-jitter_range..=jitter_range);
    (delay_secs + jitter).max(0.0)
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
