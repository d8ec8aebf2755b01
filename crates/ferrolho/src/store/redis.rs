//! Redis-backed lock store.
//!
//! Each operation runs as a single Lua script, so the check-and-mutate
//! sequence executes atomically inside Redis. The `redis` crate handles
//! `SCRIPT LOAD`/`EVALSHA` caching behind [`Script`].

use std::time::Duration;

use async_trait::async_trait;
use redis::{Script, aio::ConnectionManager};

use super::{LockKeys, LockStore, scripts};
use crate::error::{LockError, LockResult};

/// Lock store backed by a Redis instance.
pub struct RedisLockStore {
    conn: ConnectionManager,
    scripts: Scripts,
}

struct Scripts {
    acquire_write: Script,
    acquire_read: Script,
    release_write: Script,
    release_read: Script,
    renew: Script,
}

impl Scripts {
    fn new() -> Self {
        Self {
            acquire_write: Script::new(scripts::ACQUIRE_WRITE),
            acquire_read: Script::new(scripts::ACQUIRE_READ),
            release_write: Script::new(scripts::RELEASE_WRITE),
            release_read: Script::new(scripts::RELEASE_READ),
            renew: Script::new(scripts::RENEW),
        }
    }
}

impl RedisLockStore {
    /// Create a store from an existing connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            scripts: Scripts::new(),
        }
    }

    /// Connect to Redis and create a store.
    ///
    /// Example URLs:
    /// - `redis://127.0.0.1/`
    /// - `redis+tls://host:6379/`
    pub async fn connect(redis_url: &str) -> LockResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| LockError::Backend(format!("failed to create redis client: {}", e)))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| LockError::Backend(format!("failed to connect to redis: {}", e)))?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl LockStore for RedisLockStore {
    async fn try_acquire_write(
        &self,
        keys: &LockKeys,
        ttl: Duration,
        renew_on_contention: bool,
    ) -> LockResult<i64> {
        let mut conn = self.conn.clone();
        let result: i64 = self
            .scripts
            .acquire_write
            .key(&keys.reader_count)
            .key(&keys.writer_count)
            .arg(ttl.as_millis() as u64)
            .arg(renew_on_contention as u8)
            .invoke_async(&mut conn)
            .await?;
        Ok(result)
    }

    async fn try_acquire_read(
        &self,
        keys: &LockKeys,
        ttl: Duration,
        renew_on_contention: bool,
    ) -> LockResult<i64> {
        let mut conn = self.conn.clone();
        let result: i64 = self
            .scripts
            .acquire_read
            .key(&keys.reader_count)
            .key(&keys.writer_count)
            .arg(ttl.as_millis() as u64)
            .arg(renew_on_contention as u8)
            .invoke_async(&mut conn)
            .await?;
        Ok(result)
    }

    async fn release_write(&self, keys: &LockKeys) -> LockResult<i64> {
        let mut conn = self.conn.clone();
        let result: i64 = self
            .scripts
            .release_write
            .key(&keys.writer_count)
            .invoke_async(&mut conn)
            .await?;
        Ok(result)
    }

    async fn release_read(&self, keys: &LockKeys) -> LockResult<i64> {
        let mut conn = self.conn.clone();
        let result: i64 = self
            .scripts
            .release_read
            .key(&keys.reader_count)
            .invoke_async(&mut conn)
            .await?;
        Ok(result)
    }

    async fn renew(&self, keys: &LockKeys, ttl: Duration) -> LockResult<i64> {
        let mut conn = self.conn.clone();
        let result: i64 = self
            .scripts
            .renew
            .key(&keys.reader_count)
            .key(&keys.writer_count)
            .arg(ttl.as_millis() as u64)
            .invoke_async(&mut conn)
            .await?;
        Ok(result)
    }
}
