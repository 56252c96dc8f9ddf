//! Per-account mutual exclusion
//!
//! `AccountLockCoordinator` wraps a unit of work in the named lock of one or
//! more accounts, so that every mutation of an account is totally ordered
//! across tasks and processes.
//!
//! # Paths
//!
//! ```text
//! try_lock ──┬── Ok(true)          → run work, release
//!            ├── Ok(false)         → LockTimeout
//!            ├── cancelled         → LockInterrupted
//!            ├── Err(Unavailable)  → run work without the lock (fallback)
//!            └── Err(Backend)      → Lock error
//! ```
//!
//! On the fallback path the only protection left is the store's optimistic
//! version check at commit, which surfaces as `ConcurrentModification`.

use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::LockConfig;
use crate::core::traits::{LockManager, LockOwner};
use crate::types::{AccountId, ExecutionContext, LedgerError, LockError};

/// Outcome of waiting for one lock
enum Acquisition {
    Acquired,
    TimedOut,
    Interrupted,
    Unavailable(String),
}

/// Runs work under account locks
#[derive(Clone)]
pub struct AccountLockCoordinator {
    manager: Arc<dyn LockManager>,
    config: LockConfig,
}

impl AccountLockCoordinator {
    pub fn new(manager: Arc<dyn LockManager>, config: LockConfig) -> Self {
        AccountLockCoordinator { manager, config }
    }

    /// Lock name for an account
    pub fn lock_key(&self, account: AccountId) -> String {
        format!("{}{}", self.config.key_prefix, account)
    }

    /// Run `work` while holding the lock of `account`
    ///
    /// # Errors
    ///
    /// - `LockTimeout` if the lock was not acquired within the configured wait
    /// - `LockInterrupted` if `ctx` was cancelled while waiting
    /// - `Lock` if the backend answered with an error other than unavailability
    /// - Whatever `work` returns
    pub async fn execute_with_lock<T, F, Fut>(
        &self,
        ctx: &ExecutionContext,
        account: AccountId,
        work: F,
    ) -> Result<T, LedgerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        self.execute_with_locks(ctx, &[account], work).await
    }

    /// Run `work` while holding the locks of every account in `accounts`
    ///
    /// Locks are taken in ascending account order and released in reverse.
    /// Duplicate ids are locked once. If any lock cannot be taken, the ones
    /// already held are released before returning.
    pub async fn execute_with_locks<T, F, Fut>(
        &self,
        ctx: &ExecutionContext,
        accounts: &[AccountId],
        work: F,
    ) -> Result<T, LedgerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let mut ordered = accounts.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        let owner: LockOwner = Uuid::new_v4();
        let mut held: Vec<String> = Vec::with_capacity(ordered.len());

        for account in ordered {
            let key = self.lock_key(account);
            let acquisition = match self.acquire(ctx, &key, owner).await {
                Ok(acquisition) => acquisition,
                Err(error) => {
                    self.release_all(&held, owner).await;
                    return Err(error.into());
                }
            };

            match acquisition {
                Acquisition::Acquired => held.push(key),
                Acquisition::TimedOut => {
                    self.release_all(&held, owner).await;
                    tracing::warn!(key = %key, correlation_id = %ctx.correlation_id(), "lock wait timed out");
                    return Err(LedgerError::lock_timeout(&key));
                }
                Acquisition::Interrupted => {
                    self.release_all(&held, owner).await;
                    tracing::warn!(key = %key, correlation_id = %ctx.correlation_id(), "lock wait interrupted");
                    return Err(LedgerError::lock_interrupted(&key));
                }
                Acquisition::Unavailable(message) => {
                    self.release_all(&held, owner).await;
                    tracing::warn!(
                        key = %key,
                        error = %message,
                        correlation_id = %ctx.correlation_id(),
                        "lock backend unavailable, running without account lock"
                    );
                    return work().await;
                }
            }
        }

        let result = work()
            .instrument(tracing::debug_span!("locked", locks = held.len()))
            .await;
        self.release_all(&held, owner).await;
        result
    }

    async fn acquire(
        &self,
        ctx: &ExecutionContext,
        key: &str,
        owner: LockOwner,
    ) -> Result<Acquisition, LockError> {
        tokio::select! {
            biased;
            _ = ctx.cancelled() => Ok(Acquisition::Interrupted),
            attempt = self.manager.try_lock(key, owner, self.config.wait, self.config.lease) => {
                match attempt {
                    Ok(true) => Ok(Acquisition::Acquired),
                    Ok(false) => Ok(Acquisition::TimedOut),
                    Err(LockError::Unavailable { message }) => Ok(Acquisition::Unavailable(message)),
                    Err(error) => Err(error),
                }
            }
        }
    }

    async fn release_all(&self, held: &[String], owner: LockOwner) {
        for key in held.iter().rev() {
            self.release(key, owner).await;
        }
    }

    /// Release `key` if still held by `owner`; failures are logged only
    async fn release(&self, key: &str, owner: LockOwner) {
        match self.manager.is_held_by(key, owner).await {
            Ok(true) => {
                if let Err(error) = self.manager.unlock(key, owner).await {
                    tracing::warn!(key = %key, error = %error, "failed to release lock");
                }
            }
            Ok(false) => {
                tracing::warn!(key = %key, "lock lease expired before release");
            }
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "failed to check lock ownership");
            }
        }
    }
}
