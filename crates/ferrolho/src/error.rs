//! Error types for lock operations.

use thiserror::Error;

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Errors that can occur while acquiring, releasing or renewing a lock.
#[derive(Error, Debug)]
pub enum LockError {
    /// The attempt budget was spent without acquiring the lock.
    #[error("could not acquire lock after {attempts} attempts")]
    AcquireExhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// A release was issued for a lock that is not held, either because of
    /// unbalanced lock/unlock calls or because the lease already expired.
    #[error("too many unlocks")]
    TooManyUnlocks,

    /// Backend error (transport, script execution, result decoding).
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for LockError {
    fn from(err: redis::RedisError) -> Self {
        LockError::Backend(format!("Redis error: {}", err))
    }
}
