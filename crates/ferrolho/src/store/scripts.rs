//! Lua scripts implementing the atomic lock-state transitions.
//!
//! All scripts return integers following the sentinel convention: `-1` when
//! the operation did not apply, a non-negative value otherwise. TTLs are
//! passed in milliseconds as `ARGV[1]`. For the acquire scripts `ARGV[2]` is
//! `"1"` when a failed attempt should re-arm the current holder's TTL.

/// Acquire the write lock.
///
/// `KEYS[1]` = reader counter, `KEYS[2]` = writer flag. Succeeds only when
/// neither key exists.
pub const ACQUIRE_WRITE: &str = r#"
if redis.call('exists', KEYS[1]) == 0 and redis.call('exists', KEYS[2]) == 0 then
    redis.call('set', KEYS[2], 1, 'PX', ARGV[1])
    return 1
end
if ARGV[2] == '1' then
    redis.call('pexpire', KEYS[2], ARGV[1])
end
return -1
"#;

/// Acquire a read lock.
///
/// `KEYS[1]` = reader counter, `KEYS[2]` = writer flag. Succeeds whenever no
/// writer holds the lock; the counter's TTL is re-armed to the full value on
/// every successful acquire.
pub const ACQUIRE_READ: &str = r#"
if redis.call('exists', KEYS[2]) == 0 then
    local count = redis.call('incr', KEYS[1])
    redis.call('pexpire', KEYS[1], ARGV[1])
    return count
end
if ARGV[2] == '1' then
    redis.call('pexpire', KEYS[1], ARGV[1])
end
return -1
"#;

/// Release the write lock.
///
/// `KEYS[1]` = writer flag. Returns `-1` when the flag is already absent.
pub const RELEASE_WRITE: &str = r#"
if redis.call('exists', KEYS[1]) == 1 then
    redis.call('del', KEYS[1])
    return 0
end
return -1
"#;

/// Release a read lock.
///
/// `KEYS[1]` = reader counter. The key is deleted when the counter reaches
/// zero. A decrement that would take the counter below zero deletes the key
/// and reports `-1` instead of storing a negative count.
pub const RELEASE_READ: &str = r#"
if redis.call('exists', KEYS[1]) == 0 then
    return -1
end
local count = redis.call('decr', KEYS[1])
if count < 0 then
    redis.call('del', KEYS[1])
    return -1
end
if count == 0 then
    redis.call('del', KEYS[1])
end
return count
"#;

/// Re-arm the TTL on whichever lock keys exist.
///
/// `KEYS[1]` = reader counter, `KEYS[2]` = writer flag. Never creates a key
/// and never touches stored values; returns how many keys were renewed.
pub const RENEW: &str = r#"
local renewed = 0
if redis.call('exists', KEYS[1]) == 1 then
    redis.call('pexpire', KEYS[1], ARGV[1])
    renewed = renewed + 1
end
if redis.call('exists', KEYS[2]) == 1 then
    redis.call('pexpire', KEYS[2], ARGV[1])
    renewed = renewed + 1
end
return renewed
"#;
