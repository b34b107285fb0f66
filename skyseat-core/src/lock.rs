use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("Lock backend error: {0}")]
    Backend(String),
}

/// Opaque value stored under a held lock. Only the holder of the matching
/// token may release or extend it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockToken(String);

impl LockToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key under which the lock for a (flight, seat) pair is stored.
pub fn seat_lock_key(prefix: &str, flight_id: Uuid, seat_code: &str) -> String {
    format!("{}{}:{}", prefix, flight_id, seat_code)
}

/// Short-lived, token-guarded mutual exclusion over a single seat.
///
/// Locks are a concurrency signal only; seat occupancy lives in the
/// inventory store. Every lock carries a TTL so a crashed holder cannot keep
/// a seat out of circulation for longer than [`SeatLockService::ttl`].
#[async_trait]
pub trait SeatLockService: Send + Sync {
    /// Conditional set. `None` means someone else holds the lock.
    async fn acquire(&self, flight_id: Uuid, seat_code: &str) -> Result<Option<LockToken>, LockError>;

    /// Compare-and-delete. `false` when the lock is gone or held under another token.
    async fn release(&self, flight_id: Uuid, seat_code: &str, token: &LockToken) -> Result<bool, LockError>;

    async fn is_locked(&self, flight_id: Uuid, seat_code: &str) -> Result<bool, LockError>;

    /// Compare-and-expire: resets the TTL if `token` still owns the lock.
    async fn extend(&self, flight_id: Uuid, seat_code: &str, token: &LockToken) -> Result<bool, LockError>;

    fn ttl(&self) -> Duration;
}
