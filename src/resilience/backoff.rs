//! Capped exponential backoff for the accept loop.

use std::time::Duration;

/// First delay after a temporary accept error.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(5);

/// Upper bound for the accept retry delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(1);

/// Calculate the delay for the `attempt`-th consecutive failure.
///
/// Attempt 0 means no failure and yields no delay.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u32.saturating_pow(attempt - 1);
    base.saturating_mul(factor).min(max)
}

/// Tracks consecutive temporary accept failures.
///
/// Each [`next_delay`](Self::next_delay) doubles the previous delay up to
/// the cap; [`reset`](Self::reset) after a successful accept starts over.
#[derive(Debug, Clone)]
pub struct AcceptBackoff {
    initial: Duration,
    max: Duration,
    attempt: u32,
}

impl AcceptBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            attempt: 0,
        }
    }

    /// Record a failure and return how long to wait before retrying.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        calculate_backoff(self.attempt, self.initial, self.max)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Delay returned by the most recent `next_delay`, zero after a reset.
    pub fn current(&self) -> Duration {
        calculate_backoff(self.attempt, self.initial, self.max)
    }
}

impl Default for AcceptBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY)
    }
}
