//! In-memory implementations of the storage and locking seams
//!
//! - `ledger` - [`InMemoryLedger`], a `LedgerStore` with optimistic units of work
//! - `lock_manager` - [`InMemoryLockManager`], leased locks that can be switched off

pub mod ledger;
pub mod lock_manager;

pub use ledger::{InMemoryLedger, MemoryUnit};
pub use lock_manager::InMemoryLockManager;
