//! Redis-backed lock manager
//!
//! A lock is a Redis key holding the owner id, set with `SET NX PX` so it
//! expires after the lease. Release is a compare-and-delete script so a
//! holder whose lease ran out cannot remove a lock someone else now holds.
//!
//! Connection failures map to `LockError::Unavailable`, which the
//! [`AccountLockCoordinator`](crate::core::lock_coordinator::AccountLockCoordinator)
//! answers by running the work without the lock.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::core::traits::{LockManager, LockOwner};
use crate::types::LockError;

const UNLOCK_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

pub struct RedisLockManager {
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    retry_interval: Duration,
    unlock_script: redis::Script,
}

impl RedisLockManager {
    /// Create a manager for the Redis at `url`
    ///
    /// No connection is opened until the first lock call.
    ///
    /// # Errors
    ///
    /// `LockError::Backend` if `url` is not a valid Redis URL.
    pub fn new(url: &str, retry_interval: Duration) -> Result<Self, LockError> {
        let client = redis::Client::open(url)?;
        Ok(RedisLockManager {
            client,
            connection: Mutex::new(None),
            retry_interval,
            unlock_script: redis::Script::new(UNLOCK_SCRIPT),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, LockError> {
        let mut cached = self.connection.lock().await;
        if let Some(connection) = cached.as_ref() {
            return Ok(connection.clone());
        }

        let connection = self.client.get_multiplexed_async_connection().await?;
        *cached = Some(connection.clone());
        Ok(connection)
    }

    /// Drop the cached connection after an I/O failure so the next call reconnects
    async fn reset_on_unavailable<T>(&self, result: Result<T, LockError>) -> Result<T, LockError> {
        if let Err(LockError::Unavailable { message }) = &result {
            tracing::warn!(error = %message, "redis connection lost");
            self.connection.lock().await.take();
        }
        result
    }

    async fn set_if_absent(
        &self,
        connection: &mut MultiplexedConnection,
        name: &str,
        owner: LockOwner,
        lease: Duration,
    ) -> Result<bool, LockError> {
        let lease_ms = u64::try_from(lease.as_millis()).unwrap_or(u64::MAX).max(1);
        let reply: Option<String> = redis::cmd("SET")
            .arg(name)
            .arg(owner.to_string())
            .arg("NX")
            .arg("PX")
            .arg(lease_ms)
            .query_async(connection)
            .await?;
        Ok(reply.is_some())
    }

    async fn acquire(
        &self,
        name: &str,
        owner: LockOwner,
        wait: Duration,
        lease: Duration,
    ) -> Result<bool, LockError> {
        let mut connection = self.connection().await?;
        let deadline = Instant::now() + wait;
        loop {
            if self.set_if_absent(&mut connection, name, owner, lease).await? {
                return Ok(true);
            }
            // Re-entrant for the same owner
            let holder = self.holder(&mut connection, name).await?;
            if holder.as_deref() == Some(owner.to_string().as_str()) {
                return Ok(true);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.retry_interval.min(deadline - now)).await;
        }
    }

    async fn holder(
        &self,
        connection: &mut MultiplexedConnection,
        name: &str,
    ) -> Result<Option<String>, LockError> {
        let holder: Option<String> = redis::cmd("GET").arg(name).query_async(connection).await?;
        Ok(holder)
    }
}

#[async_trait]
impl LockManager for RedisLockManager {
    async fn try_lock(
        &self,
        name: &str,
        owner: LockOwner,
        wait: Duration,
        lease: Duration,
    ) -> Result<bool, LockError> {
        let result = self.acquire(name, owner, wait, lease).await;
        self.reset_on_unavailable(result).await
    }

    async fn unlock(&self, name: &str, owner: LockOwner) -> Result<(), LockError> {
        let result = async {
            let mut connection = self.connection().await?;
            let _: i64 = self
                .unlock_script
                .key(name)
                .arg(owner.to_string())
                .invoke_async(&mut connection)
                .await?;
            Ok::<_, LockError>(())
        }
        .await;
        self.reset_on_unavailable(result).await
    }

    async fn is_held_by(&self, name: &str, owner: LockOwner) -> Result<bool, LockError> {
        let result = async {
            let mut connection = self.connection().await?;
            let holder = self.holder(&mut connection, name).await?;
            Ok::<_, LockError>(holder.as_deref() == Some(owner.to_string().as_str()))
        }
        .await;
        self.reset_on_unavailable(result).await
    }
}
