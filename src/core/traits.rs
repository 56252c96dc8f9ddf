//! Core traits for ledger storage, locking and exchange rates
//!
//! These are the seams between the ledger core and its collaborators. The
//! crate ships in-memory implementations (see [`crate::core::memory`]) and a
//! Redis lock manager; a relational store plugs in by implementing
//! [`LedgerStore`] and [`UnitOfWork`].

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::types::{
    Account, AccountId, DueQuery, FeePolicyId, FeeRecord, LedgerError, LockError,
    NewRegularRemittance, OverseasRemittance, Page, PageRequest, Recipient, RecipientIdentity,
    RecipientQuery, RegularRemittance, RemittanceFee, ScheduleId, ScheduleStatus, ScheduleUpdate,
    Transaction,
};

/// Identity of a lock holder
pub type LockOwner = Uuid;

/// Atomic unit of work against the ledger store
///
/// Writes are staged and become visible only on [`UnitOfWork::commit`].
/// Dropping a unit without committing discards every staged write.
///
/// # Isolation contract
///
/// Accounts carry a `version`. `commit` fails with
/// `LedgerError::ConcurrentModification` when any saved account's stored
/// version no longer equals the version it was read with, and in that case
/// nothing from the unit is applied.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Read an account, seeing this unit's own staged writes
    async fn find_account(&mut self, id: AccountId) -> Result<Option<Account>, LedgerError>;

    /// Stage an account write
    async fn save_account(&mut self, account: &Account) -> Result<(), LedgerError>;

    /// Stage a transaction entry
    async fn append_transaction(&mut self, transaction: Transaction) -> Result<(), LedgerError>;

    /// Stage a remittance execution
    async fn save_remittance(&mut self, remittance: &OverseasRemittance) -> Result<(), LedgerError>;

    /// Stage a fee record
    async fn save_fee_record(&mut self, record: &FeeRecord) -> Result<(), LedgerError>;

    async fn find_fee_policy(
        &mut self,
        id: FeePolicyId,
    ) -> Result<Option<RemittanceFee>, LedgerError>;

    async fn find_recipient(
        &mut self,
        query: &RecipientQuery,
    ) -> Result<Option<Recipient>, LedgerError>;

    /// Apply every staged write atomically
    async fn commit(self: Box<Self>) -> Result<(), LedgerError>;

    /// Discard every staged write
    async fn rollback(self: Box<Self>) -> Result<(), LedgerError>;
}

/// Durable storage for accounts, transactions and remittance schedules
///
/// Methods other than [`LedgerStore::begin`] run in their own implicit unit of
/// work and commit immediately.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a unit of work
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, LedgerError>;

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, LedgerError>;

    /// Durably append a transaction entry outside any open unit of work
    ///
    /// Used for FAILURE entries, which must survive the rollback of the unit
    /// that produced them.
    async fn append_transaction(&self, transaction: Transaction) -> Result<(), LedgerError>;

    /// Transaction history of an account in append order
    async fn transactions_for_account(
        &self,
        account: AccountId,
    ) -> Result<Vec<Transaction>, LedgerError>;

    /// One keyset page of schedules matching `query`, ordered by id
    async fn find_regular_remittances_due(
        &self,
        query: &DueQuery,
        page: PageRequest,
    ) -> Result<Page<RegularRemittance>, LedgerError>;

    async fn find_regular_remittance(
        &self,
        id: ScheduleId,
    ) -> Result<Option<RegularRemittance>, LedgerError>;

    async fn find_regular_remittances_by_account(
        &self,
        account: AccountId,
    ) -> Result<Vec<RegularRemittance>, LedgerError>;

    /// Persist a new schedule and assign its id
    async fn insert_regular_remittance(
        &self,
        new: NewRegularRemittance,
    ) -> Result<RegularRemittance, LedgerError>;

    /// Apply `update` to a schedule and return the stored result
    ///
    /// The status is never written here.
    async fn update_regular_remittance(
        &self,
        id: ScheduleId,
        update: ScheduleUpdate,
    ) -> Result<RegularRemittance, LedgerError>;

    /// Move a schedule to `to` if its stored status is one of `from`
    ///
    /// The check and the write are one atomic step. Returns `false`, changing
    /// nothing, when the stored status is not in `from`.
    async fn transition_schedule_status(
        &self,
        id: ScheduleId,
        from: &[ScheduleStatus],
        to: ScheduleStatus,
    ) -> Result<bool, LedgerError>;

    async fn delete_regular_remittance(&self, id: ScheduleId) -> Result<(), LedgerError>;

    /// Executions produced by a schedule, oldest first
    async fn remittances_for_schedule(
        &self,
        id: ScheduleId,
    ) -> Result<Vec<OverseasRemittance>, LedgerError>;

    async fn find_recipient(&self, query: &RecipientQuery)
        -> Result<Option<Recipient>, LedgerError>;

    /// Return the recipient with this identity, creating it when absent
    async fn find_or_create_recipient(
        &self,
        identity: RecipientIdentity,
        country: &str,
        currency: &str,
    ) -> Result<Recipient, LedgerError>;

    async fn find_fee_policy(&self, id: FeePolicyId)
        -> Result<Option<RemittanceFee>, LedgerError>;
}

/// Leased, named mutual exclusion shared across processes
///
/// `try_lock` must distinguish "the backend is down"
/// (`Err(LockError::Unavailable)`) from "someone else holds it" (`Ok(false)`).
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Try to acquire `name` for `owner`, waiting up to `wait`
    ///
    /// The lock expires on its own after `lease` if never released.
    async fn try_lock(
        &self,
        name: &str,
        owner: LockOwner,
        wait: Duration,
        lease: Duration,
    ) -> Result<bool, LockError>;

    /// Release `name` if `owner` still holds it
    async fn unlock(&self, name: &str, owner: LockOwner) -> Result<(), LockError>;

    async fn is_held_by(&self, name: &str, owner: LockOwner) -> Result<bool, LockError>;
}

/// Source of exchange rates
///
/// Rates are expressed in a common base currency: `rates()["USD"]` is the
/// price of one USD in the base currency.
#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    async fn rates(&self) -> Result<HashMap<String, Decimal>, LedgerError>;
}
