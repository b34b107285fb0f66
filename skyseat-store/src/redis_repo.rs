use async_trait::async_trait;
use redis::AsyncCommands;
use skyseat_core::lock::{seat_lock_key, LockError, LockToken, SeatLockService};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const RELEASE_SCRIPT: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        return redis.call("DEL", KEYS[1])
    else
        return 0
    end
"#;

const EXTEND_SCRIPT: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        return redis.call("PEXPIRE", KEYS[1], ARGV[2])
    else
        return 0
    end
"#;

/// Seat locks shared by every instance pointing at the same Redis.
#[derive(Clone)]
pub struct RedisLockService {
    client: redis::Client,
    key_prefix: String,
    ttl: Duration,
}

fn backend(e: redis::RedisError) -> LockError {
    LockError::Backend(e.to_string())
}

impl RedisLockService {
    pub fn new(connection_string: &str, key_prefix: &str, ttl: Duration) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self {
            client,
            key_prefix: key_prefix.to_string(),
            ttl,
        })
    }

    fn key(&self, flight_id: Uuid, seat_code: &str) -> String {
        seat_lock_key(&self.key_prefix, flight_id, seat_code)
    }

    fn ttl_ms(&self) -> u64 {
        self.ttl.as_millis() as u64
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, LockError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl SeatLockService for RedisLockService {
    async fn acquire(&self, flight_id: Uuid, seat_code: &str) -> Result<Option<LockToken>, LockError> {
        let mut conn = self.connection().await?;
        let key = self.key(flight_id, seat_code);
        let token = LockToken::generate();

        // SET NX PX: only set if no one holds the seat
        let result: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(token.as_str())
            .arg("NX")
            .arg("PX")
            .arg(self.ttl_ms())
            .query_async(&mut conn)
            .await
            .map_err(backend)?;

        if result.is_some() {
            debug!("Seat lock acquired: {}", key);
            Ok(Some(token))
        } else {
            debug!("Seat lock contended: {}", key);
            Ok(None)
        }
    }

    async fn release(&self, flight_id: Uuid, seat_code: &str, token: &LockToken) -> Result<bool, LockError> {
        let mut conn = self.connection().await?;
        let key = self.key(flight_id, seat_code);

        let deleted: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(&key)
            .arg(token.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;

        if deleted != 1 {
            warn!("Seat lock {} was not held by token {}", key, token);
        }
        Ok(deleted == 1)
    }

    async fn is_locked(&self, flight_id: Uuid, seat_code: &str) -> Result<bool, LockError> {
        let mut conn = self.connection().await?;
        conn.exists(self.key(flight_id, seat_code))
            .await
            .map_err(backend)
    }

    async fn extend(&self, flight_id: Uuid, seat_code: &str, token: &LockToken) -> Result<bool, LockError> {
        let mut conn = self.connection().await?;

        let extended: i64 = redis::Script::new(EXTEND_SCRIPT)
            .key(self.key(flight_id, seat_code))
            .arg(token.as_str())
            .arg(self.ttl_ms())
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;

        Ok(extended == 1)
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}
