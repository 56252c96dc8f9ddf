//! In-memory ledger store
//!
//! `InMemoryLedger` implements [`LedgerStore`] over concurrent maps. It backs
//! the CLI, the tests and the benchmarks, and doubles as the reference for the
//! unit-of-work contract a persistent store has to honour.
//!
//! # Units of work
//!
//! A [`MemoryUnit`] stages every write locally. `commit` takes the store's
//! commit guard, checks that each staged account still has the version it was
//! read with, and only then applies the staged writes and bumps the versions.
//! A version mismatch rejects the whole unit with `ConcurrentModification`.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;

use crate::core::traits::{LedgerStore, UnitOfWork};
use crate::types::{
    Account, AccountId, DueQuery, FeePolicyId, FeeRecord, FeeRecordId, LedgerError,
    NewRegularRemittance, OverseasRemittance, Page, PageRequest, Recipient, RecipientId,
    RecipientIdentity, RecipientQuery, RegularRemittance, RemittanceFee, RemittanceId, ScheduleId,
    ScheduleStatus, ScheduleUpdate, Transaction,
};

#[derive(Debug, Default)]
struct LedgerState {
    accounts: DashMap<AccountId, Account>,
    transactions: DashMap<AccountId, Vec<Transaction>>,
    remittances: DashMap<RemittanceId, OverseasRemittance>,
    fee_records: DashMap<FeeRecordId, FeeRecord>,
    fee_policies: DashMap<FeePolicyId, RemittanceFee>,
    recipients: DashMap<RecipientId, Recipient>,
    recipient_identities: DashMap<RecipientIdentity, RecipientId>,

    /// Ordered by id for keyset paging
    schedules: RwLock<BTreeMap<ScheduleId, RegularRemittance>>,

    next_schedule_id: AtomicU64,
    next_recipient_id: AtomicU64,

    /// Serializes unit-of-work commits
    commit_guard: Mutex<()>,
}

fn poisoned<T>(_: T) -> LedgerError {
    LedgerError::storage("in-memory ledger lock poisoned")
}

impl LedgerState {
    fn find_recipient(&self, query: &RecipientQuery) -> Option<Recipient> {
        let id = match query {
            RecipientQuery::ById(id) => *id,
            RecipientQuery::ByIdentity(identity) => *self.recipient_identities.get(identity)?,
        };
        self.recipients.get(&id).map(|recipient| recipient.clone())
    }

    fn push_transaction(&self, transaction: Transaction) {
        self.transactions
            .entry(transaction.account)
            .or_default()
            .push(transaction);
    }
}

/// `LedgerStore` backed by process memory
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<LedgerState>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account
    pub fn insert_account(&self, account: Account) {
        self.state.accounts.insert(account.id, account);
    }

    pub fn insert_fee_policy(&self, policy: RemittanceFee) {
        self.state.fee_policies.insert(policy.id, policy);
    }

    /// Insert a recipient with a caller-chosen id
    pub fn insert_recipient(&self, recipient: Recipient) {
        self.state
            .next_recipient_id
            .fetch_max(recipient.id, Ordering::SeqCst);
        self.state
            .recipient_identities
            .insert(recipient.identity(), recipient.id);
        self.state.recipients.insert(recipient.id, recipient);
    }

    /// Insert a schedule with a caller-chosen id
    pub fn insert_schedule(&self, schedule: RegularRemittance) -> Result<(), LedgerError> {
        self.state
            .next_schedule_id
            .fetch_max(schedule.id, Ordering::SeqCst);
        self.state
            .schedules
            .write()
            .map_err(poisoned)?
            .insert(schedule.id, schedule);
        Ok(())
    }

    /// Snapshot of one account
    pub fn account(&self, id: AccountId) -> Option<Account> {
        self.state.accounts.get(&id).map(|account| account.clone())
    }

    /// Snapshot of every account, ordered by id
    pub fn accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self
            .state
            .accounts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        accounts.sort_by_key(|account| account.id);
        accounts
    }

    /// Snapshot of every remittance execution, oldest first
    pub fn remittances(&self) -> Vec<OverseasRemittance> {
        let mut remittances: Vec<OverseasRemittance> = self
            .state
            .remittances
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        remittances.sort_by_key(|remittance| remittance.created_at);
        remittances
    }

    pub fn fee_records(&self) -> Vec<FeeRecord> {
        self.state
            .fee_records
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn recipient_count(&self) -> usize {
        self.state.recipients.len()
    }

    /// Number of transaction entries across all accounts
    pub fn transaction_count(&self) -> usize {
        self.state
            .transactions
            .iter()
            .map(|entry| entry.value().len())
            .sum()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, LedgerError> {
        Ok(Box::new(MemoryUnit::new(Arc::clone(&self.state))))
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        Ok(self.account(id))
    }

    async fn append_transaction(&self, transaction: Transaction) -> Result<(), LedgerError> {
        self.state.push_transaction(transaction);
        Ok(())
    }

    async fn transactions_for_account(
        &self,
        account: AccountId,
    ) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self
            .state
            .transactions
            .get(&account)
            .map(|entries| entries.clone())
            .unwrap_or_default())
    }

    async fn find_regular_remittances_due(
        &self,
        query: &DueQuery,
        page: PageRequest,
    ) -> Result<Page<RegularRemittance>, LedgerError> {
        let schedules = self.state.schedules.read().map_err(poisoned)?;
        let lower = match page.after {
            Some(after) => Bound::Excluded(after),
            None => Bound::Unbounded,
        };

        let mut items: Vec<RegularRemittance> = schedules
            .range((lower, Bound::Unbounded))
            .map(|(_, schedule)| schedule)
            .filter(|schedule| query.matches(schedule))
            .take(page.size + 1)
            .cloned()
            .collect();

        let next = if items.len() > page.size {
            items.truncate(page.size);
            items.last().map(|last| PageRequest {
                after: Some(last.id),
                size: page.size,
            })
        } else {
            None
        };

        Ok(Page { items, next })
    }

    async fn find_regular_remittance(
        &self,
        id: ScheduleId,
    ) -> Result<Option<RegularRemittance>, LedgerError> {
        let schedules = self.state.schedules.read().map_err(poisoned)?;
        Ok(schedules.get(&id).cloned())
    }

    async fn find_regular_remittances_by_account(
        &self,
        account: AccountId,
    ) -> Result<Vec<RegularRemittance>, LedgerError> {
        let schedules = self.state.schedules.read().map_err(poisoned)?;
        Ok(schedules
            .values()
            .filter(|schedule| schedule.account == account)
            .cloned()
            .collect())
    }

    async fn insert_regular_remittance(
        &self,
        new: NewRegularRemittance,
    ) -> Result<RegularRemittance, LedgerError> {
        let id = self.state.next_schedule_id.fetch_add(1, Ordering::SeqCst) + 1;
        let schedule = RegularRemittance {
            id,
            account: new.account,
            client: new.client,
            recipient: new.recipient,
            fee_policy: new.fee_policy,
            from_currency: new.from_currency,
            to_currency: new.to_currency,
            amount: new.amount,
            schedule: new.schedule,
            status: ScheduleStatus::Active,
            created_at: Utc::now(),
        };
        self.state
            .schedules
            .write()
            .map_err(poisoned)?
            .insert(id, schedule.clone());
        Ok(schedule)
    }

    async fn update_regular_remittance(
        &self,
        id: ScheduleId,
        update: ScheduleUpdate,
    ) -> Result<RegularRemittance, LedgerError> {
        let mut schedules = self.state.schedules.write().map_err(poisoned)?;
        let stored = schedules
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found("regular remittance", id))?;
        update.apply_to(stored);
        Ok(stored.clone())
    }

    async fn transition_schedule_status(
        &self,
        id: ScheduleId,
        from: &[ScheduleStatus],
        to: ScheduleStatus,
    ) -> Result<bool, LedgerError> {
        let mut schedules = self.state.schedules.write().map_err(poisoned)?;
        let stored = schedules
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found("regular remittance", id))?;
        if !from.contains(&stored.status) {
            return Ok(false);
        }
        stored.status = to;
        Ok(true)
    }

    async fn delete_regular_remittance(&self, id: ScheduleId) -> Result<(), LedgerError> {
        let mut schedules = self.state.schedules.write().map_err(poisoned)?;
        schedules
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| LedgerError::not_found("regular remittance", id))
    }

    async fn remittances_for_schedule(
        &self,
        id: ScheduleId,
    ) -> Result<Vec<OverseasRemittance>, LedgerError> {
        Ok(self
            .remittances()
            .into_iter()
            .filter(|remittance| remittance.schedule == Some(id))
            .collect())
    }

    async fn find_recipient(
        &self,
        query: &RecipientQuery,
    ) -> Result<Option<Recipient>, LedgerError> {
        Ok(self.state.find_recipient(query))
    }

    async fn find_or_create_recipient(
        &self,
        identity: RecipientIdentity,
        country: &str,
        currency: &str,
    ) -> Result<Recipient, LedgerError> {
        let id = *self
            .state
            .recipient_identities
            .entry(identity.clone())
            .or_insert_with(|| {
                let id = self.state.next_recipient_id.fetch_add(1, Ordering::SeqCst) + 1;
                self.state.recipients.insert(
                    id,
                    Recipient {
                        id,
                        name: identity.name.clone(),
                        bank_code: identity.bank_code.clone(),
                        account_number: identity.account_number.clone(),
                        country: country.to_string(),
                        currency: currency.to_string(),
                    },
                );
                id
            });

        self.state
            .recipients
            .get(&id)
            .map(|recipient| recipient.clone())
            .ok_or_else(|| LedgerError::not_found("recipient", id))
    }

    async fn find_fee_policy(
        &self,
        id: FeePolicyId,
    ) -> Result<Option<RemittanceFee>, LedgerError> {
        Ok(self.state.fee_policies.get(&id).map(|policy| policy.clone()))
    }
}

/// Unit of work over an [`InMemoryLedger`]
pub struct MemoryUnit {
    state: Arc<LedgerState>,
    accounts: HashMap<AccountId, Account>,
    transactions: Vec<Transaction>,
    remittances: HashMap<RemittanceId, OverseasRemittance>,
    fee_records: Vec<FeeRecord>,
}

impl MemoryUnit {
    fn new(state: Arc<LedgerState>) -> Self {
        MemoryUnit {
            state,
            accounts: HashMap::new(),
            transactions: Vec::new(),
            remittances: HashMap::new(),
            fee_records: Vec::new(),
        }
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn find_account(&mut self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        if let Some(staged) = self.accounts.get(&id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.state.accounts.get(&id).map(|account| account.clone()))
    }

    async fn save_account(&mut self, account: &Account) -> Result<(), LedgerError> {
        self.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn append_transaction(&mut self, transaction: Transaction) -> Result<(), LedgerError> {
        self.transactions.push(transaction);
        Ok(())
    }

    async fn save_remittance(&mut self, remittance: &OverseasRemittance) -> Result<(), LedgerError> {
        self.remittances.insert(remittance.id, remittance.clone());
        Ok(())
    }

    async fn save_fee_record(&mut self, record: &FeeRecord) -> Result<(), LedgerError> {
        self.fee_records.push(record.clone());
        Ok(())
    }

    async fn find_fee_policy(
        &mut self,
        id: FeePolicyId,
    ) -> Result<Option<RemittanceFee>, LedgerError> {
        Ok(self.state.fee_policies.get(&id).map(|policy| policy.clone()))
    }

    async fn find_recipient(
        &mut self,
        query: &RecipientQuery,
    ) -> Result<Option<Recipient>, LedgerError> {
        Ok(self.state.find_recipient(query))
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        let unit = *self;
        let _guard = unit.state.commit_guard.lock().map_err(poisoned)?;

        for (id, staged) in &unit.accounts {
            let stored_version = unit.state.accounts.get(id).map(|stored| stored.version);
            match stored_version {
                Some(version) if version == staged.version => {}
                None if staged.version == 0 => {}
                _ => return Err(LedgerError::concurrent_modification(*id)),
            }
        }

        for (id, mut account) in unit.accounts {
            account.version += 1;
            unit.state.accounts.insert(id, account);
        }
        for transaction in unit.transactions {
            unit.state.push_transaction(transaction);
        }
        for (id, remittance) in unit.remittances {
            unit.state.remittances.insert(id, remittance);
        }
        for record in unit.fee_records {
            unit.state.fee_records.insert(record.id, record);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        Ok(())
    }
}
