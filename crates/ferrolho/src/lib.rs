//! Ferrolho - distributed reader-writer lock on Redis
//!
//! ## Purpose
//! Lets independent processes coordinate exclusive-write or shared-read
//! access to a named resource without running a consensus protocol
//! themselves. Correctness is delegated to the store's atomic script
//! execution plus lease (TTL) expiry: every held key carries a TTL, so a
//! crashed holder releases its lock automatically once the lease lapses.
//!
//! ## Design
//! - **Two keys per lock identity**: a shared reader counter and an
//!   exclusive writer flag, mutated only through atomic store operations.
//! - **Bounded polling**: contended acquisitions poll on a configurable
//!   retry policy (fixed delay or exponential backoff with jitter) up to an
//!   attempt budget.
//! - **Lease refresh**: a held lock can be renewed manually with
//!   [`RwLock::refresh`], or automatically by a per-lock background task
//!   ticking at half the TTL.
//! - **Swappable store**: the atomic operations live behind the
//!   [`LockStore`] trait; [`RedisLockStore`] runs them as Lua scripts,
//!   [`MemoryLockStore`] provides the same semantics in-process for tests
//!   and single-process deployments.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use ferrolho::{LockConfig, RedisLockStore, RwLock};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RedisLockStore::connect("redis://127.0.0.1/").await?);
//!
//! let lock = RwLock::new(
//!     store,
//!     "inventory",
//!     LockConfig {
//!         key_ttl: Duration::from_secs(5),
//!         auto_refresh: true,
//!         ..LockConfig::default()
//!     },
//! );
//!
//! lock.lock().await?;
//! // exclusive section; the refresher keeps the lease alive
//! lock.unlock().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod retry;
pub mod rwlock;
pub mod store;

pub use config::{LockConfig, RetryPolicy};
pub use error::{LockError, LockResult};
pub use rwlock::{RENEWAL_FAILURES_METRIC, RwLock};
pub use store::{LockKeys, LockStore, memory::MemoryLockStore, redis::RedisLockStore};

/// Register metric descriptions with the installed metrics recorder.
/// Call once at application startup if a recorder is installed.
pub fn describe_metrics() {
    metrics::describe_counter!(
        RENEWAL_FAILURES_METRIC,
        "Lease renewals that failed against the store"
    );
}
