//! # Fibonacci Backoff
//!
//! Provides a Fibonacci-based backoff for requeueing failed reconciliations.
//! It grows more slowly than exponential backoff, so a ConfigMap that keeps
//! losing write races is retried soon without hammering the API server.
//!
//! Default sequence: 1s, 1s, 2s, 3s, 5s, 8s, ... capped at 5m.

use std::time::Duration;

/// Smallest delay before a failed key is retried
pub const DEFAULT_MIN_BACKOFF: Duration = Duration::from_secs(1);

/// Largest delay before a failed key is retried
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, starting at `min` twice and
/// capped at `max`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff (for reset)
    min: Duration,
    /// Previous backoff
    prev: Duration,
    /// Current backoff
    current: Duration,
    /// Maximum backoff
    max: Duration,
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_BACKOFF, DEFAULT_MAX_BACKOFF)
    }
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with the given bounds
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            prev: Duration::ZERO,
            current: min,
            max,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;

        let next = self.prev.saturating_add(self.current);
        self.prev = self.current;
        self.current = std::cmp::min(next, self.max);

        result
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.min;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(backoff: &mut FibonacciBackoff) -> u64 {
        backoff.next_backoff().as_secs()
    }

    #[test]
    fn test_fibonacci_backoff_sequence() {
        let mut backoff = FibonacciBackoff::new(Duration::from_secs(1), Duration::from_secs(10));

        assert_eq!(secs(&mut backoff), 1);
        assert_eq!(secs(&mut backoff), 1);
        assert_eq!(secs(&mut backoff), 2);
        assert_eq!(secs(&mut backoff), 3);
        assert_eq!(secs(&mut backoff), 5);
        assert_eq!(secs(&mut backoff), 8);
        assert_eq!(secs(&mut backoff), 10); // capped
    }

    #[test]
    fn test_fibonacci_backoff_max_cap() {
        let mut backoff = FibonacciBackoff::new(Duration::from_secs(1), Duration::from_secs(10));

        for _ in 0..7 {
            backoff.next_backoff();
        }
        // Next would be 18s (10+8), but should stay at the cap
        assert_eq!(secs(&mut backoff), 10);
        assert_eq!(secs(&mut backoff), 10);
    }

    #[test]
    fn test_fibonacci_backoff_reset() {
        let mut backoff = FibonacciBackoff::new(Duration::from_secs(1), Duration::from_secs(10));

        assert_eq!(secs(&mut backoff), 1);
        assert_eq!(secs(&mut backoff), 1);
        assert_eq!(secs(&mut backoff), 2);
        assert_eq!(secs(&mut backoff), 3);

        backoff.reset();

        // Should restart from beginning after success
        assert_eq!(secs(&mut backoff), 1);
        assert_eq!(secs(&mut backoff), 1);
        assert_eq!(secs(&mut backoff), 2);
    }

    #[test]
    fn test_default_bounds() {
        let mut backoff = FibonacciBackoff::default();
        assert_eq!(backoff.next_backoff(), DEFAULT_MIN_BACKOFF);
        for _ in 0..50 {
            assert!(backoff.next_backoff() <= DEFAULT_MAX_BACKOFF);
        }
    }
}
