//! Types module
//!
//! Contains core data structures used throughout the ledger.
//! This module organizes types into logical submodules:
//! - `account`: Account identity, balance and lifecycle state
//! - `transaction`: Transaction types and the immutable ledger entry
//! - `remittance`: Recipients, fee policies, fee records and remittance executions
//! - `schedule`: Standing (regular) remittances and paging types
//! - `context`: Execution context carried through every call
//! - `error`: Error types for the ledger core

pub mod account;
pub mod context;
pub mod error;
pub mod remittance;
pub mod schedule;
pub mod transaction;

pub use account::{Account, AccountId, AccountState, AccountType, ClientId, MONEY_SCALE};
pub use context::ExecutionContext;
pub use error::{ErrorKind, LedgerError, LockError};
pub use remittance::{
    FeePolicyId, FeeRecord, FeeRecordId, OverseasRemittance, Recipient, RecipientId,
    RecipientIdentity, RecipientQuery, RemittanceFee, RemittanceId, RemittanceStatus,
};
pub use schedule::{
    DueQuery, NewRegularRemittance, Page, PageRequest, RegularRemittance, Schedule, ScheduleId,
    ScheduleKind, ScheduleStatus, ScheduleUpdate,
};
pub use transaction::{Transaction, TransactionId, TransactionStatus, TransactionType};
