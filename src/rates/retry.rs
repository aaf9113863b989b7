//! Retry policy for rate-limited provider calls.

use super::ProviderError;
use backoff::backoff::Backoff;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(4);
pub const DEFAULT_BACKOFF_FACTOR: u32 = 2;

/// Deterministic exponential backoff with a hard attempt ceiling.
///
/// The delay after failed attempt `n` (0-based) is
/// `base_delay * backoff_factor^n`; with the defaults that is `2^(n+2)`
/// seconds. `max_attempts` counts the first try.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: u32,
    pub is_retryable: fn(&ProviderError) -> bool,
    attempt: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff_factor,
            is_retryable: ProviderError::is_rate_limited,
            attempt: 0,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Delay before the retry that follows failed attempt `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(self.backoff_factor.saturating_pow(attempt))
    }

    /// Wrap an error for the backoff loop according to `is_retryable`.
    pub fn classify(&self, err: ProviderError) -> backoff::Error<ProviderError> {
        if (self.is_retryable)(&err) {
            backoff::Error::transient(err)
        } else {
            backoff::Error::permanent(err)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY, DEFAULT_BACKOFF_FACTOR)
    }
}

impl Backoff for RetryPolicy {
    fn reset(&mut self) {
        self.attempt = 0;
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.attempt + 1 >= self.max_attempts {
            return None;
        }
        let delay = self.delay_for(self.attempt);
        self.attempt += 1;
        Some(delay)
    }
}
