//! # Fibonacci Backoff
//!
//! Spacing between retries of a coordinator call. Grows more slowly than
//! exponential backoff so a maintenance daemon that is restarting is not
//! hammered, while a short blip is retried quickly.
//!
//! Sequence for `new(1s, 8s)`: 1s, 1s, 2s, 3s, 5s, 8s, 8s, ...

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, capped at `max`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min: Duration,
    prev: Duration,
    current: Duration,
    max: Duration,
}

impl FibonacciBackoff {
    /// # Arguments
    ///
    /// * `min` - first two delays
    /// * `max` - cap for every later delay
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            prev: Duration::ZERO,
            current: min,
            max,
        }
    }

    /// Return the current delay and advance the sequence.
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;
        let next = self.prev.saturating_add(self.current);
        self.prev = self.current;
        self.current = next.min(self.max);
        result
    }

    /// Restart from `min` after a success.
    pub fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.min;
    }

    /// Delay before retry number `attempt` (0-indexed), without keeping state.
    #[must_use]
    pub fn delay_for_attempt(attempt: u32, min: Duration, max: Duration) -> Duration {
        let mut backoff = Self::new(min, max);
        let mut delay = backoff.next_backoff();
        for _ in 0..attempt {
            delay = backoff.next_backoff();
            if delay >= max {
                break;
            }
        }
        delay
    }
}
