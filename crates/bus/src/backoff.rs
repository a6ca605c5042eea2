//! Reconnect backoff math.

use std::time::Duration;

/// Exponential backoff without an attempt limit.
///
/// The delay before the Nth consecutive retry is `min(base * 2^(N-1), max)`.
#[derive(Debug, Clone, Copy)]
pub struct BackoffState {
    attempts: u32,
    base: Duration,
    max: Duration,
}

impl BackoffState {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            attempts: 0,
            base,
            max: max.max(base),
        }
    }

    /// Back to the base delay after a successful connection.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay that the next call to [`next_delay_and_advance`](Self::next_delay_and_advance) returns.
    pub fn peek_delay(&self) -> Duration {
        let factor = 1u32.checked_shl(self.attempts).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Advance to the next attempt.
    ///
    /// Returns the delay to wait *before* performing this attempt.
    pub fn next_delay_and_advance(&mut self) -> Duration {
        let delay = self.peek_delay();
        self.attempts = self.attempts.saturating_add(1);
        delay
    }
}
