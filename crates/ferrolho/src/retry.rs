//! Retry delay policies for the lock acquisition loop.

use std::time::Duration;

use rand::Rng;

// Shifting past this would overflow the u32 multiplier; the delay is capped
// at `max_delay` long before that anyway.
const MAX_SHIFT: u32 = 31;

/// Produces successive wait durations for a polling loop.
pub trait Retrier: Send {
    /// The delay to wait before the next attempt.
    fn next_delay(&mut self) -> Duration;

    /// Restart the delay sequence for a fresh acquisition.
    fn reset(&mut self);
}

/// Constant-delay policy.
#[derive(Clone, Debug)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Retrier for FixedDelay {
    fn next_delay(&mut self) -> Duration {
        self.delay
    }

    fn reset(&mut self) {}
}

/// Exponential backoff with jitter.
///
/// The deterministic component doubles on every attempt starting from
/// `min_delay`; a uniformly random jitter in `[0, component / 2)` is added
/// on top, and the total is capped at `max_delay`. Bounding the jitter below
/// the deterministic component keeps it from dominating the wait while still
/// spreading out contending pollers.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    min_delay: Duration,
    max_delay: Duration,
    retry_count: u32,
}

impl ExponentialBackoff {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay,
            retry_count: 0,
        }
    }
}

impl Retrier for ExponentialBackoff {
    fn next_delay(&mut self) -> Duration {
        let shift = self.retry_count.min(MAX_SHIFT);
        let exp_delay = self.min_delay.saturating_mul(1u32 << shift);
        self.retry_count = self.retry_count.saturating_add(1);

        if exp_delay >= self.max_delay {
            return self.max_delay;
        }

        let half_ms = exp_delay.as_millis() as u64 / 2;
        let jitter = if half_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..half_ms))
        };

        (exp_delay + jitter).min(self.max_delay)
    }

    fn reset(&mut self) {
        self.retry_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_delay_is_constant() {
        let mut retrier = FixedDelay::new(Duration::from_millis(50));

        for _ in 0..10 {
            assert_eq!(retrier.next_delay(), Duration::from_millis(50));
        }

        retrier.reset();
        assert_eq!(retrier.next_delay(), Duration::from_millis(50));
    }

    #[test]
    fn backoff_delays_are_bounded_and_grow() {
        let min = Duration::from_millis(10);
        let max = Duration::from_millis(200);
        let mut retrier = ExponentialBackoff::new(min, max);

        let mut previous_floor = Duration::ZERO;
        for attempt in 0..10u32 {
            let delay = retrier.next_delay();
            let floor = min.saturating_mul(1u32 << attempt.min(MAX_SHIFT)).min(max);

            // Each delay sits at or above its deterministic component and
            // never exceeds the cap; the component itself never shrinks.
            assert!(delay >= floor, "attempt {}: {:?} < {:?}", attempt, delay, floor);
            assert!(delay <= max, "attempt {}: {:?} > {:?}", attempt, delay, max);
            assert!(floor >= previous_floor);
            previous_floor = floor;
        }
    }

    #[test]
    fn backoff_jitter_stays_below_half_the_component() {
        let min = Duration::from_millis(100);
        let max = Duration::from_secs(60);
        let mut retrier = ExponentialBackoff::new(min, max);

        for attempt in 0..6u32 {
            let delay = retrier.next_delay();
            let exp_delay = min * (1u32 << attempt);
            assert!(delay < exp_delay + exp_delay / 2);
        }
    }

    #[test]
    fn backoff_reset_restarts_the_sequence() {
        let min = Duration::from_millis(10);
        let max = Duration::from_millis(500);
        let mut retrier = ExponentialBackoff::new(min, max);

        for _ in 0..6 {
            retrier.next_delay();
        }
        retrier.reset();

        // First delay after reset is back in the first-attempt band:
        // [min, min + min / 2).
        let delay = retrier.next_delay();
        assert!(delay >= min);
        assert!(delay < min + min / 2);
    }

    #[test]
    fn backoff_saturates_at_max_for_large_attempt_counts() {
        let mut retrier =
            ExponentialBackoff::new(Duration::from_millis(1), Duration::from_millis(100));

        let mut last = Duration::ZERO;
        for _ in 0..64 {
            last = retrier.next_delay();
        }
        assert_eq!(last, Duration::from_millis(100));
    }
}
