//! Lock configuration.

use std::time::Duration;

use crate::retry::{ExponentialBackoff, FixedDelay, Retrier};

/// Retry delay policy used while polling a contended lock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Constant delay between attempts, taken from
    /// [`LockConfig::retry_delay`].
    Fixed,
    /// Doubling delay with random jitter, capped at `max_delay`.
    ExponentialBackoff {
        min_delay: Duration,
        max_delay: Duration,
    },
}

/// Configuration for a [`RwLock`](crate::RwLock).
#[derive(Clone, Debug)]
pub struct LockConfig {
    /// TTL applied to the reader/writer keys on acquisition and renewal.
    /// A held lock whose TTL elapses without renewal is released by the
    /// store itself.
    pub key_ttl: Duration,
    /// Delay between acquisition attempts when `retry_policy` is
    /// [`RetryPolicy::Fixed`].
    pub retry_delay: Duration,
    /// Maximum acquisition attempts before `lock`/`rlock` give up.
    pub max_attempts: u32,
    /// Renew the lease from a background task while the lock is held.
    pub auto_refresh: bool,
    /// Re-arm the current holder's TTL whenever a contending acquisition
    /// attempt fails, so that polling by non-holders keeps the holder's
    /// lease from lapsing mid-contention.
    pub renew_on_contention: bool,
    /// Retry delay policy.
    pub retry_policy: RetryPolicy,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            key_ttl: Duration::from_millis(500),
            retry_delay: Duration::from_millis(50),
            max_attempts: 20,
            auto_refresh: false,
            renew_on_contention: true,
            retry_policy: RetryPolicy::Fixed,
        }
    }
}

impl LockConfig {
    pub(crate) fn build_retrier(&self) -> Box<dyn Retrier> {
        match self.retry_policy {
            RetryPolicy::Fixed => Box::new(FixedDelay::new(self.retry_delay)),
            RetryPolicy::ExponentialBackoff {
                min_delay,
                max_delay,
            } => Box::new(ExponentialBackoff::new(min_delay, max_delay)),
        }
    }
}
