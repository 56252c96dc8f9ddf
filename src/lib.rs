//! Remittance Ledger Library
//!
//! # Overview
//!
//! Account ledger with overseas remittances and scheduled standing
//! instructions. Every balance mutation runs under a per-account distributed
//! lock and inside one unit of work, and every attempted mutation leaves a
//! SUCCESS or FAILURE entry in the transaction history.
//!
//! # Architecture
//!
//! - [`types`] - Accounts, transactions, remittances, schedules and errors
//! - [`strategy`] - Pluggable balance mutations per transaction type
//! - [`core`] - Business logic:
//!   - [`core::lock_coordinator`] - Per-account locking with fallback
//!   - [`core::engine`] - Strategy dispatch and transaction recording
//!   - [`core::remittance`] - Fee and principal debits of one remittance
//!   - [`core::scheduler`] - Monthly and weekly batch runs
//!   - [`core::regular_remittance`] - Standing instruction management
//! - [`io`] - CSV seed loading and account output
//! - [`config`], [`logging`], [`cli`], [`app`] - Process setup
//!
//! # Scheduling
//!
//! The monthly job defers due instructions on weekends and holidays and
//! catches them up on the next business day. On the last day of a short month
//! it also runs instructions registered for the days the month lacks.

pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use app::LedgerServices;
pub use config::Config;
pub use core::{
    AccountLockCoordinator, InMemoryLedger, InMemoryLockManager, RegularRemittanceScheduler,
    RemittanceService, TransactionEngine,
};
pub use io::write_accounts_csv;
pub use types::{
    Account, AccountId, ClientId, ExecutionContext, LedgerError, Transaction, TransactionType,
};
