//! Core business logic module
//!
//! - `traits` - Storage, lock and rate abstractions
//! - `engine` - Strategy dispatch and transaction recording
//! - `lock_coordinator` - Per-account distributed locking with fallback
//! - `remittance` - Overseas remittance execution
//! - `regular_remittance` - Standing instruction management
//! - `scheduler` - Monthly and weekly batch runs
//! - `account_service`, `exchange` - Interactive account operations
//! - `memory`, `redis_lock` - Bundled backends

pub mod account_service;
pub mod calendar;
pub mod engine;
pub mod exchange;
pub mod lock_coordinator;
pub mod memory;
pub mod rates;
pub mod redis_lock;
pub mod regular_remittance;
pub mod remittance;
pub mod scheduler;
pub mod traits;

pub use account_service::AccountService;
pub use calendar::BusinessCalendar;
pub use engine::TransactionEngine;
pub use exchange::{ExchangeResult, ExchangeService};
pub use lock_coordinator::AccountLockCoordinator;
pub use memory::{InMemoryLedger, InMemoryLockManager};
pub use rates::StaticRateProvider;
pub use redis_lock::RedisLockManager;
pub use regular_remittance::{RegistrationRequest, RegularRemittanceService};
pub use remittance::{
    RecipientRef, RemittanceCommand, RemittanceProcessor, RemittanceRequest, RemittanceResult,
    RemittanceService,
};
pub use scheduler::{RegularRemittanceScheduler, RunReport};
pub use traits::{ExchangeRateProvider, LedgerStore, LockManager, LockOwner, UnitOfWork};
