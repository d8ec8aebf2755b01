//! Distributed reader-writer lock facade.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, warn};

use crate::config::LockConfig;
use crate::error::{LockError, LockResult};
use crate::retry::Retrier;
use crate::store::{LockKeys, LockStore, NOT_APPLIED};

/// Counter of lease renewals that failed against the store.
pub const RENEWAL_FAILURES_METRIC: &str = "ferrolho_lease_renewal_failures_total";

/// A distributed reader-writer lock over a shared store.
///
/// Multiple processes construct an instance with the same lock identity
/// against the same store; the store's atomic operations serialize their
/// acquisition attempts. Writers are exclusive; readers share. Every held
/// key carries a TTL, so a crashed holder releases the lock by expiry.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use ferrolho::{LockConfig, RedisLockStore, RwLock};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(RedisLockStore::connect("redis://127.0.0.1/").await?);
/// let lock = RwLock::new(store, "orders", LockConfig::default());
///
/// lock.lock().await?;
/// // exclusive section
/// lock.unlock().await?;
/// # Ok(())
/// # }
/// ```
pub struct RwLock {
    store: Arc<dyn LockStore>,
    id: String,
    keys: LockKeys,
    config: LockConfig,
    retrier: Mutex<Box<dyn Retrier>>,
    refresher: Mutex<RefresherState>,
}

#[derive(Clone, Copy, Debug)]
enum Mode {
    Read,
    Write,
}

struct RefresherState {
    running: bool,
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RwLock {
    /// Create a lock handle for the given identity.
    pub fn new(store: Arc<dyn LockStore>, id: impl Into<String>, config: LockConfig) -> Self {
        let id = id.into();
        Self {
            keys: LockKeys::for_id(&id),
            retrier: Mutex::new(config.build_retrier()),
            refresher: Mutex::new(RefresherState {
                running: false,
                stop_tx: None,
                handle: None,
            }),
            store,
            id,
            config,
        }
    }

    /// Acquire the write lock, polling until it is free or the attempt
    /// budget is spent.
    pub async fn lock(&self) -> LockResult<()> {
        self.acquire_loop(Mode::Write).await
    }

    /// Single non-blocking attempt at the write lock.
    pub async fn try_lock(&self) -> LockResult<bool> {
        self.try_once(Mode::Write).await
    }

    /// Release the write lock.
    pub async fn unlock(&self) -> LockResult<()> {
        let result = self.store.release_write(&self.keys).await?;
        if result == NOT_APPLIED {
            return Err(LockError::TooManyUnlocks);
        }
        debug!(id = %self.id, "write lock released");
        self.stop_refresher();
        Ok(())
    }

    /// Acquire a read lock, polling until no writer holds the lock or the
    /// attempt budget is spent.
    pub async fn rlock(&self) -> LockResult<()> {
        self.acquire_loop(Mode::Read).await
    }

    /// Single non-blocking attempt at a read lock.
    pub async fn try_rlock(&self) -> LockResult<bool> {
        self.try_once(Mode::Read).await
    }

    /// Release a read lock.
    pub async fn runlock(&self) -> LockResult<()> {
        let result = self.store.release_read(&self.keys).await?;
        if result == NOT_APPLIED {
            return Err(LockError::TooManyUnlocks);
        }
        debug!(id = %self.id, readers = result, "read lock released");
        self.stop_refresher();
        Ok(())
    }

    /// Re-arm the TTL on the held keys.
    ///
    /// A no-op when auto-refresh is enabled, since the background task
    /// already renews the lease on its own cadence.
    pub async fn refresh(&self) -> LockResult<()> {
        if self.config.auto_refresh {
            return Ok(());
        }
        self.store.renew(&self.keys, self.config.key_ttl).await?;
        Ok(())
    }

    async fn try_acquire(&self, mode: Mode) -> LockResult<i64> {
        match mode {
            Mode::Write => {
                self.store
                    .try_acquire_write(
                        &self.keys,
                        self.config.key_ttl,
                        self.config.renew_on_contention,
                    )
                    .await
            }
            Mode::Read => {
                self.store
                    .try_acquire_read(
                        &self.keys,
                        self.config.key_ttl,
                        self.config.renew_on_contention,
                    )
                    .await
            }
        }
    }

    async fn try_once(&self, mode: Mode) -> LockResult<bool> {
        let acquired = self.try_acquire(mode).await? != NOT_APPLIED;
        if acquired {
            self.on_acquired(mode, 1);
        }
        Ok(acquired)
    }

    /// Drive repeated try-acquire calls through the retrier until success
    /// or the attempt budget is exhausted. Store errors abort immediately;
    /// only "not yet acquired" is retried. Dropping the returned future at
    /// any await point abandons the acquisition.
    async fn acquire_loop(&self, mode: Mode) -> LockResult<()> {
        self.retrier.lock().reset();

        for attempt in 1..=self.config.max_attempts {
            if self.try_acquire(mode).await? != NOT_APPLIED {
                self.on_acquired(mode, attempt);
                return Ok(());
            }
            if attempt < self.config.max_attempts {
                let delay = self.retrier.lock().next_delay();
                tokio::time::sleep(delay).await;
            }
        }

        Err(LockError::AcquireExhausted {
            attempts: self.config.max_attempts,
        })
    }

    fn on_acquired(&self, mode: Mode, attempt: u32) {
        debug!(id = %self.id, mode = ?mode, attempt, "lock acquired");
        if self.config.auto_refresh {
            self.start_refresher();
        }
    }

    /// Start the lease refresher task. Idempotent: a start while one is
    /// already running is a no-op.
    fn start_refresher(&self) {
        let mut state = self.refresher.lock();
        if state.running {
            return;
        }

        let (stop_tx, stop_rx) = mpsc::channel(1);
        let task = RefreshTask {
            store: Arc::clone(&self.store),
            id: self.id.clone(),
            keys: self.keys.clone(),
            ttl: self.config.key_ttl,
        };

        state.running = true;
        state.stop_tx = Some(stop_tx);
        state.handle = Some(tokio::spawn(task.run(stop_rx)));
    }

    /// Stop the lease refresher task. Idempotent the same way.
    fn stop_refresher(&self) {
        let mut state = self.refresher.lock();
        if !state.running {
            return;
        }

        state.running = false;
        if let Some(stop_tx) = state.stop_tx.take() {
            // try_send: the task may already have exited, and a blocked
            // send here would stall the release path.
            let _ = stop_tx.try_send(());
        }
        state.handle = None;
    }
}

impl Drop for RwLock {
    fn drop(&mut self) {
        // A refresher that was never stopped must not outlive its lock.
        let state = self.refresher.get_mut();
        if let Some(handle) = state.handle.take() {
            handle.abort();
        }
    }
}

/// Background lease renewal for a held lock.
struct RefreshTask {
    store: Arc<dyn LockStore>,
    id: String,
    keys: LockKeys,
    ttl: Duration,
}

impl RefreshTask {
    async fn run(self, mut stop_rx: mpsc::Receiver<()>) {
        // Half the TTL guarantees at least one renewal attempt lands before
        // expiry even if a tick is delayed.
        let period = (self.ttl / 2).max(Duration::from_millis(1));
        let mut ticker = interval(period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.store.renew(&self.keys, self.ttl).await {
                        Ok(renewed) => {
                            debug!(id = %self.id, renewed, "lease renewed");
                        }
                        Err(err) => {
                            // A missed renewal is not fatal: worst case the
                            // lease expires and the lock self-releases.
                            counter!(RENEWAL_FAILURES_METRIC).increment(1);
                            warn!(id = %self.id, error = %err, "lease renewal failed");
                        }
                    }
                }
                _ = stop_rx.recv() => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryLockStore;

    fn lock() -> RwLock {
        RwLock::new(
            Arc::new(MemoryLockStore::new()),
            "lifecycle",
            LockConfig::default(),
        )
    }

    #[tokio::test]
    async fn refresher_start_and_stop_are_idempotent() {
        let lock = lock();
        assert!(!lock.refresher.lock().running);

        lock.start_refresher();
        assert!(lock.refresher.lock().running);
        let first_tx = lock.refresher.lock().stop_tx.clone();

        // A second start leaves the running task untouched.
        lock.start_refresher();
        assert!(
            lock.refresher
                .lock()
                .stop_tx
                .as_ref()
                .is_some_and(|tx| first_tx.as_ref().is_some_and(|f| tx.same_channel(f)))
        );

        lock.stop_refresher();
        {
            let state = lock.refresher.lock();
            assert!(!state.running);
            assert!(state.stop_tx.is_none());
            assert!(state.handle.is_none());
        }

        // Stopping again is a no-op.
        lock.stop_refresher();
        assert!(!lock.refresher.lock().running);
    }

    #[tokio::test]
    async fn stop_without_start_is_a_noop() {
        let lock = lock();
        lock.stop_refresher();
        assert!(!lock.refresher.lock().running);
    }
}
