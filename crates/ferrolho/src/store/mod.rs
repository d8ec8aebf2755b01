//! Store abstraction: the atomic multi-key operations the lock protocol
//! runs against.
//!
//! The lock state for one identity lives in two store keys, a shared reader
//! counter and an exclusive writer flag. Every transition over those keys is
//! a single atomic operation on the store side, so the store is the sole
//! arbiter of ordering between contending processes.

pub mod memory;
pub mod redis;
pub mod scripts;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::LockResult;

/// Key prefix for the shared reader counter.
pub const READER_COUNT_KEY_PREFIX: &str = "reader_count_";

/// Key prefix for the exclusive writer flag.
pub const WRITER_COUNT_KEY_PREFIX: &str = "writer_count_";

/// Sentinel returned by store operations that did not apply, distinct from
/// every valid count or flag result (which are all non-negative).
pub const NOT_APPLIED: i64 = -1;

/// The pair of store keys encoding hold state for one lock identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockKeys {
    /// Non-negative reader counter; an absent key reads as zero.
    pub reader_count: String,
    /// Presence of this key (value irrelevant) marks an exclusive holder.
    pub writer_count: String,
}

impl LockKeys {
    /// Derive the key pair for a lock identity.
    pub fn for_id(id: &str) -> Self {
        Self {
            reader_count: format!("{}{}", READER_COUNT_KEY_PREFIX, id),
            writer_count: format!("{}{}", WRITER_COUNT_KEY_PREFIX, id),
        }
    }
}

/// Atomic lock-state transitions executed by a TTL-capable key-value store.
///
/// Results follow the sentinel convention: [`NOT_APPLIED`] (`-1`) means the
/// operation found the state unsuitable and left lock state unchanged;
/// non-negative values are substantive results.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Acquire the writer flag if neither readers nor a writer currently
    /// hold the lock, applying `ttl` to the new key.
    ///
    /// Returns a non-negative sentinel on success. On contention returns
    /// [`NOT_APPLIED`]; when `renew_on_contention` is set the failing
    /// attempt re-arms the writer key's TTL so the holder's lease does not
    /// race against polling traffic.
    async fn try_acquire_write(
        &self,
        keys: &LockKeys,
        ttl: Duration,
        renew_on_contention: bool,
    ) -> LockResult<i64>;

    /// Increment the reader counter (creating it at 1) if no writer holds
    /// the lock, re-arming the counter's TTL to the full `ttl`.
    ///
    /// Returns the new reader count on success, [`NOT_APPLIED`] when a
    /// writer holds the lock; `renew_on_contention` re-arms the reader key
    /// on the failing path.
    async fn try_acquire_read(
        &self,
        keys: &LockKeys,
        ttl: Duration,
        renew_on_contention: bool,
    ) -> LockResult<i64>;

    /// Delete the writer flag. Returns a non-negative sentinel, or
    /// [`NOT_APPLIED`] if the flag was absent ("too many unlocks").
    async fn release_write(&self, keys: &LockKeys) -> LockResult<i64>;

    /// Decrement the reader counter, deleting the key when it reaches zero.
    /// Returns the remaining count, or [`NOT_APPLIED`] if the counter was
    /// already absent ("too many unlocks").
    async fn release_read(&self, keys: &LockKeys) -> LockResult<i64>;

    /// Re-arm the TTL of whichever of the two keys currently exist. Never
    /// creates a key and never changes stored values. Returns the number of
    /// keys renewed.
    async fn renew(&self, keys: &LockKeys, ttl: Duration) -> LockResult<i64>;
}
