//! Error types for the remittance ledger
//!
//! This module defines every error the core can surface, plus the lock
//! manager's own error type.
//!
//! # Error Categories
//!
//! - **Precondition errors**: not found, insufficient funds, duplicate schedule,
//!   forbidden, inactive account. Raised before any mutation; zero side effects.
//! - **Lock errors**: lock timeout and lock interruption. Distinct from business
//!   errors so callers can retry them.
//! - **Mutation errors**: `TransactionFailed`, raised after the FAILURE
//!   transaction record was written, and `ConcurrentModification`, raised by a
//!   unit of work whose account was changed underneath it.
//! - **Infrastructure errors**: storage and lock backend failures.

use rust_decimal::Decimal;
use thiserror::Error;

use super::account::{AccountId, AccountState, ClientId};
use super::remittance::{RecipientId, RemittanceStatus};
use super::schedule::{ScheduleId, ScheduleStatus};
use super::transaction::TransactionType;

/// Main error type for the ledger core
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// A referenced entity (account, recipient, fee policy, schedule, rate) is missing
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity kind, e.g. "account"
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Balance does not cover the requested debit
    #[error("Insufficient funds for account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        balance: Decimal,
        requested: Decimal,
    },

    /// The account lock could not be acquired within the configured wait
    #[error("Timed out waiting for lock '{key}'")]
    LockTimeout { key: String },

    /// The wait for an account lock was cancelled
    #[error("Interrupted while waiting for lock '{key}'")]
    LockInterrupted { key: String },

    /// A strategy failed; the FAILURE transaction record has been written
    #[error("{tx_type} of {amount} on account {account} failed: {source}")]
    TransactionFailed {
        tx_type: TransactionType,
        account: AccountId,
        amount: Decimal,
        #[source]
        source: Box<LedgerError>,
    },

    /// The same standing instruction is already registered
    #[error("Regular remittance from account {account} to recipient {recipient} is already registered")]
    DuplicateSchedule {
        account: AccountId,
        recipient: RecipientId,
    },

    /// The caller does not own the resource
    #[error("Client {client} is not allowed to modify {resource}")]
    Forbidden { client: ClientId, resource: String },

    /// No strategy registered for the requested type
    #[error("Unknown transaction type '{tx_type}'")]
    UnknownTransactionType { tx_type: String },

    /// The account changed between read and commit
    #[error("Account {account} was modified concurrently")]
    ConcurrentModification { account: AccountId },

    /// The account's lifecycle state forbids mutations
    #[error("Account {account} is {state}")]
    AccountUnavailable {
        account: AccountId,
        state: AccountState,
    },

    /// Amount is zero, negative, or otherwise unusable
    #[error("Invalid amount {amount}")]
    InvalidAmount { amount: Decimal },

    /// Both sides of a two-account operation are the same account
    #[error("Source and target account are both {account}")]
    SameAccount { account: AccountId },

    /// A standing instruction was paused before it could execute
    #[error("Regular remittance {schedule} is {status}")]
    ScheduleNotRunnable {
        schedule: ScheduleId,
        status: ScheduleStatus,
    },

    /// Schedule descriptor is invalid
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// A remittance status change would regress or leave a terminal status
    #[error("Invalid remittance status transition {from} -> {to}")]
    InvalidStatusTransition {
        from: RemittanceStatus,
        to: RemittanceStatus,
    },

    /// Lock backend answered with an error other than unavailability
    #[error("Lock backend error: {message}")]
    Lock { message: String },

    /// Ledger store failure
    #[error("Storage error: {message}")]
    Storage { message: String },
}

/// Stable error kind for caller-side branching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InsufficientFunds,
    LockTimeout,
    LockInterrupted,
    TransactionFailed,
    DuplicateSchedule,
    Forbidden,
    UnknownTransactionType,
    Conflict,
    InvalidRequest,
    Lock,
    Storage,
}

impl ErrorKind {
    /// Stable string code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientFunds => "insufficient_funds",
            ErrorKind::LockTimeout => "lock_timeout",
            ErrorKind::LockInterrupted => "lock_interrupted",
            ErrorKind::TransactionFailed => "transaction_failed",
            ErrorKind::DuplicateSchedule => "duplicate_schedule",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::UnknownTransactionType => "unknown_transaction_type",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Lock => "lock_error",
            ErrorKind::Storage => "storage_error",
        }
    }
}

impl LedgerError {
    /// Kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::LockTimeout { .. } => ErrorKind::LockTimeout,
            LedgerError::LockInterrupted { .. } => ErrorKind::LockInterrupted,
            LedgerError::TransactionFailed { .. } => ErrorKind::TransactionFailed,
            LedgerError::DuplicateSchedule { .. } => ErrorKind::DuplicateSchedule,
            LedgerError::Forbidden { .. } => ErrorKind::Forbidden,
            LedgerError::UnknownTransactionType { .. } => ErrorKind::UnknownTransactionType,
            LedgerError::ConcurrentModification { .. } => ErrorKind::Conflict,
            LedgerError::AccountUnavailable { .. }
            | LedgerError::InvalidAmount { .. }
            | LedgerError::SameAccount { .. }
            | LedgerError::InvalidSchedule(_)
            | LedgerError::ScheduleNotRunnable { .. }
            | LedgerError::InvalidStatusTransition { .. } => ErrorKind::InvalidRequest,
            LedgerError::Lock { .. } => ErrorKind::Lock,
            LedgerError::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// Kind of the innermost cause, looking through `TransactionFailed`
    pub fn root_kind(&self) -> ErrorKind {
        match self {
            LedgerError::TransactionFailed { source, .. } => source.root_kind(),
            other => other.kind(),
        }
    }

    /// Whether repeating the same call may succeed
    ///
    /// Lock timeouts and optimistic conflicts are transient; business errors
    /// such as insufficient funds are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::LockTimeout | ErrorKind::Conflict
        )
    }

    /// Whether the error came from the locking layer
    pub fn is_lock_error(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::LockTimeout | ErrorKind::LockInterrupted | ErrorKind::Lock
        )
    }
}

// Helper functions for creating common errors

impl LedgerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn account_not_found(account: AccountId) -> Self {
        Self::not_found("account", account)
    }

    pub fn insufficient_funds(account: AccountId, balance: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientFunds {
            account,
            balance,
            requested,
        }
    }

    pub fn lock_timeout(key: &str) -> Self {
        LedgerError::LockTimeout {
            key: key.to_string(),
        }
    }

    pub fn lock_interrupted(key: &str) -> Self {
        LedgerError::LockInterrupted {
            key: key.to_string(),
        }
    }

    pub fn transaction_failed(
        tx_type: TransactionType,
        account: AccountId,
        amount: Decimal,
        cause: LedgerError,
    ) -> Self {
        LedgerError::TransactionFailed {
            tx_type,
            account,
            amount,
            source: Box::new(cause),
        }
    }

    pub fn duplicate_schedule(account: AccountId, recipient: RecipientId) -> Self {
        LedgerError::DuplicateSchedule { account, recipient }
    }

    pub fn forbidden(client: ClientId, resource: impl ToString) -> Self {
        LedgerError::Forbidden {
            client,
            resource: resource.to_string(),
        }
    }

    pub fn unknown_transaction_type(tx_type: impl ToString) -> Self {
        LedgerError::UnknownTransactionType {
            tx_type: tx_type.to_string(),
        }
    }

    pub fn concurrent_modification(account: AccountId) -> Self {
        LedgerError::ConcurrentModification { account }
    }

    pub fn account_unavailable(account: AccountId, state: AccountState) -> Self {
        LedgerError::AccountUnavailable { account, state }
    }

    pub fn invalid_amount(amount: Decimal) -> Self {
        LedgerError::InvalidAmount { amount }
    }

    pub fn same_account(account: AccountId) -> Self {
        LedgerError::SameAccount { account }
    }

    pub fn schedule_not_runnable(schedule: ScheduleId, status: ScheduleStatus) -> Self {
        LedgerError::ScheduleNotRunnable { schedule, status }
    }

    pub fn invalid_status_transition(from: RemittanceStatus, to: RemittanceStatus) -> Self {
        LedgerError::InvalidStatusTransition { from, to }
    }

    pub fn storage(message: impl ToString) -> Self {
        LedgerError::Storage {
            message: message.to_string(),
        }
    }
}

/// Errors reported by a lock manager backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// The backend cannot be reached; callers fall back to unlocked execution
    #[error("Lock backend unavailable: {message}")]
    Unavailable { message: String },

    /// The backend answered with an error
    #[error("Lock backend error: {message}")]
    Backend { message: String },
}

impl From<redis::RedisError> for LockError {
    fn from(error: redis::RedisError) -> Self {
        if error.is_io_error()
            || error.is_connection_refusal()
            || error.is_connection_dropped()
            || error.is_timeout()
        {
            LockError::Unavailable {
                message: error.to_string(),
            }
        } else {
            LockError::Backend {
                message: error.to_string(),
            }
        }
    }
}

impl From<LockError> for LedgerError {
    fn from(error: LockError) -> Self {
        LedgerError::Lock {
            message: error.to_string(),
        }
    }
}
