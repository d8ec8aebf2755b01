//! In-process lock store.
//!
//! Implements the same atomic semantics as the Redis scripts over a
//! process-local map: a single mutex around every operation mirrors the
//! single-threaded execution of a script inside Redis. Expiry is evaluated
//! lazily against the tokio clock, so tests can pause and advance time
//! deterministically.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::{LockKeys, LockStore, NOT_APPLIED};
use crate::error::LockResult;

struct Entry {
    value: i64,
    expires_at: Instant,
}

/// Lock store holding keys in a process-local map.
///
/// Useful for tests and for single-process deployments that want the lock
/// semantics without a Redis instance.
#[derive(Default)]
pub struct MemoryLockStore {
    keys: Mutex<HashMap<String, Entry>>,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a key, if present and unexpired. Probe for tests
    /// and diagnostics.
    pub fn value(&self, key: &str) -> Option<i64> {
        let mut keys = self.keys.lock();
        Self::purge_expired(&mut keys, key);
        keys.get(key).map(|entry| entry.value)
    }

    fn purge_expired(keys: &mut HashMap<String, Entry>, key: &str) {
        let now = Instant::now();
        if keys.get(key).is_some_and(|entry| now >= entry.expires_at) {
            keys.remove(key);
        }
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn try_acquire_write(
        &self,
        keys: &LockKeys,
        ttl: Duration,
        renew_on_contention: bool,
    ) -> LockResult<i64> {
        let mut map = self.keys.lock();
        Self::purge_expired(&mut map, &keys.reader_count);
        Self::purge_expired(&mut map, &keys.writer_count);

        if !map.contains_key(&keys.reader_count) && !map.contains_key(&keys.writer_count) {
            map.insert(
                keys.writer_count.clone(),
                Entry {
                    value: 1,
                    expires_at: Instant::now() + ttl,
                },
            );
            return Ok(1);
        }

        if renew_on_contention
            && let Some(entry) = map.get_mut(&keys.writer_count)
        {
            entry.expires_at = Instant::now() + ttl;
        }
        Ok(NOT_APPLIED)
    }

    async fn try_acquire_read(
        &self,
        keys: &LockKeys,
        ttl: Duration,
        renew_on_contention: bool,
    ) -> LockResult<i64> {
        let mut map = self.keys.lock();
        Self::purge_expired(&mut map, &keys.reader_count);
        Self::purge_expired(&mut map, &keys.writer_count);

        if map.contains_key(&keys.writer_count) {
            if renew_on_contention
                && let Some(entry) = map.get_mut(&keys.reader_count)
            {
                entry.expires_at = Instant::now() + ttl;
            }
            return Ok(NOT_APPLIED);
        }

        let entry = map.entry(keys.reader_count.clone()).or_insert(Entry {
            value: 0,
            expires_at: Instant::now() + ttl,
        });
        entry.value += 1;
        entry.expires_at = Instant::now() + ttl;
        Ok(entry.value)
    }

    async fn release_write(&self, keys: &LockKeys) -> LockResult<i64> {
        let mut map = self.keys.lock();
        Self::purge_expired(&mut map, &keys.writer_count);

        if map.remove(&keys.writer_count).is_some() {
            Ok(0)
        } else {
            Ok(NOT_APPLIED)
        }
    }

    async fn release_read(&self, keys: &LockKeys) -> LockResult<i64> {
        let mut map = self.keys.lock();
        Self::purge_expired(&mut map, &keys.reader_count);

        let Some(entry) = map.get_mut(&keys.reader_count) else {
            return Ok(NOT_APPLIED);
        };
        entry.value -= 1;
        let value = entry.value;
        if value <= 0 {
            map.remove(&keys.reader_count);
        }
        if value < 0 { Ok(NOT_APPLIED) } else { Ok(value) }
    }

    async fn renew(&self, keys: &LockKeys, ttl: Duration) -> LockResult<i64> {
        let mut map = self.keys.lock();

        let mut renewed = 0;
        for key in [&keys.reader_count, &keys.writer_count] {
            Self::purge_expired(&mut map, key);
            if let Some(entry) = map.get_mut(key.as_str()) {
                entry.expires_at = Instant::now() + ttl;
                renewed += 1;
            }
        }
        Ok(renewed)
    }
}
