//! Reconnect Backoff
//!
//! Exponential delay between reconnect attempts. The delay handed out for the
//! k-th consecutive failure is `min(base * 2^k, max)`; a confirmed-live
//! connection resets it to `base`.

use std::time::Duration;

/// Doubling reconnect delay bounded by `[base, max]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Create a backoff starting at `base`
    ///
    /// A `max` below `base` is raised to `base`.
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        let max = max.max(base);
        Self {
            base,
            max,
            current: base,
        }
    }

    /// Delay for the next attempt; doubles the delay for the one after
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Back to the base delay
    pub fn reset(&mut self) {
        self.current = self.base;
    }

    /// Delay the next failure would get
    #[must_use]
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Base delay
    #[must_use]
    pub fn base(&self) -> Duration {
        self.base
    }

    /// Ceiling
    #[must_use]
    pub fn max(&self) -> Duration {
        self.max
    }
}
