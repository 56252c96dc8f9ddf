//! In-process lock manager
//!
//! Leases are kept in a `DashMap` keyed by lock name. Waiting is a poll loop
//! on the configured retry interval, bounded by the caller's wait.
//!
//! The backend can be switched to "unavailable" at runtime, which makes every
//! call fail with `LockError::Unavailable` the way an unreachable Redis does.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

use crate::core::traits::{LockManager, LockOwner};
use crate::types::LockError;

#[derive(Debug, Clone, Copy)]
struct Lease {
    owner: LockOwner,
    expires_at: Instant,
}

/// `LockManager` backed by process memory
#[derive(Debug)]
pub struct InMemoryLockManager {
    leases: DashMap<String, Lease>,
    available: AtomicBool,
    acquisitions: AtomicU64,
    retry_interval: Duration,
}

impl InMemoryLockManager {
    pub fn new(retry_interval: Duration) -> Self {
        InMemoryLockManager {
            leases: DashMap::new(),
            available: AtomicBool::new(true),
            acquisitions: AtomicU64::new(0),
            retry_interval,
        }
    }

    /// Simulate the backend going down or coming back
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of successful acquisitions so far
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Whether `name` is currently held by anyone
    pub fn is_locked(&self, name: &str) -> bool {
        let now = Instant::now();
        self.leases
            .get(name)
            .map(|lease| lease.expires_at > now)
            .unwrap_or(false)
    }

    fn ensure_available(&self) -> Result<(), LockError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LockError::Unavailable {
                message: "in-memory lock backend disabled".to_string(),
            })
        }
    }

    /// One acquisition attempt; takes over expired leases
    fn attempt(&self, name: &str, owner: LockOwner, lease: Duration) -> bool {
        let now = Instant::now();
        let fresh = Lease {
            owner,
            expires_at: now + lease,
        };

        let mut current = self.leases.entry(name.to_string()).or_insert(fresh);
        if current.owner == owner {
            return true;
        }
        if current.expires_at <= now {
            *current.value_mut() = fresh;
            return true;
        }
        false
    }
}

impl Default for InMemoryLockManager {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::config::DEFAULT_LOCK_RETRY_MS))
    }
}

#[async_trait]
impl LockManager for InMemoryLockManager {
    async fn try_lock(
        &self,
        name: &str,
        owner: LockOwner,
        wait: Duration,
        lease: Duration,
    ) -> Result<bool, LockError> {
        let deadline = Instant::now() + wait;
        loop {
            self.ensure_available()?;
            if self.attempt(name, owner, lease) {
                self.acquisitions.fetch_add(1, Ordering::SeqCst);
                return Ok(true);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.retry_interval.min(deadline - now)).await;
        }
    }

    async fn unlock(&self, name: &str, owner: LockOwner) -> Result<(), LockError> {
        self.ensure_available()?;
        self.leases.remove_if(name, |_, lease| lease.owner == owner);
        Ok(())
    }

    async fn is_held_by(&self, name: &str, owner: LockOwner) -> Result<bool, LockError> {
        self.ensure_available()?;
        let now = Instant::now();
        Ok(self
            .leases
            .get(name)
            .map(|lease| lease.owner == owner && lease.expires_at > now)
            .unwrap_or(false))
    }
}
