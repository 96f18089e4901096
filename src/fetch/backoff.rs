//! Exponential backoff schedule for upstream retries.

use rand::Rng;
use std::time::Duration;

/// Exponential backoff with a ceiling.
///
/// The delay after failed attempt `n` (0-based) is `min(base * 2^n, cap)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay after the first failed attempt.
    pub base: Duration,
    /// Upper bound for any single delay.
    pub cap: Duration,
    /// Randomize each delay into `[delay / 2, delay]`.
    pub jitter: bool,
}

impl BackoffPolicy {
    /// Creates a policy without jitter.
    #[must_use]
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            jitter: false,
        }
    }

    /// Creates a policy from millisecond values.
    #[must_use]
    pub fn from_millis(base_ms: u64, cap_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(cap_ms))
    }

    /// Enables or disables equal jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Deterministic delay for the given attempt index.
    ///
    /// Saturates instead of overflowing, so any `attempt` yields a value
    /// no greater than `cap`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base.as_millis().min(u128::from(u64::MAX)) as u64;
        let cap_ms = self.cap.as_millis().min(u128::from(u64::MAX)) as u64;
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay_ms = base_ms.saturating_mul(factor).min(cap_ms);
        Duration::from_millis(delay_ms)
    }

    /// Delay actually slept before the next attempt.
    ///
    /// Equal to [`delay`](Self::delay) unless jitter is enabled.
    #[must_use]
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        let delay = self.delay(attempt);
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let half = delay / 2;
        let spread = (delay - half).as_millis() as u64;
        let extra = rand::rng().random_range(0..=spread);
        half + Duration::from_millis(extra)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_millis(500, 5000)
    }
}
