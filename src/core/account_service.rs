//! Interactive account operations
//!
//! Deposits and withdrawals requested directly by a client. Each call runs in
//! its own unit of work under the account lock and goes through the same
//! [`TransactionEngine`] as remittances.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::Instrument;

use crate::core::engine::TransactionEngine;
use crate::core::lock_coordinator::AccountLockCoordinator;
use crate::core::traits::LedgerStore;
use crate::types::{AccountId, ExecutionContext, LedgerError, Transaction, TransactionType};

pub struct AccountService {
    store: Arc<dyn LedgerStore>,
    engine: Arc<TransactionEngine>,
    locks: Arc<AccountLockCoordinator>,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        engine: Arc<TransactionEngine>,
        locks: Arc<AccountLockCoordinator>,
    ) -> Self {
        AccountService {
            store,
            engine,
            locks,
        }
    }

    /// Credit `amount` to the account
    pub async fn deposit(
        &self,
        ctx: &ExecutionContext,
        account: AccountId,
        amount: Decimal,
    ) -> Result<Transaction, LedgerError> {
        self.movement(ctx, TransactionType::Deposit, account, amount)
            .instrument(ctx.span("deposit"))
            .await
    }

    /// Debit `amount` from the account
    ///
    /// # Errors
    ///
    /// `TransactionFailed` wrapping `InsufficientFunds` if the balance is
    /// below `amount`; the FAILURE entry is recorded.
    pub async fn withdraw(
        &self,
        ctx: &ExecutionContext,
        account: AccountId,
        amount: Decimal,
    ) -> Result<Transaction, LedgerError> {
        self.movement(ctx, TransactionType::Withdrawal, account, amount)
            .instrument(ctx.span("withdraw"))
            .await
    }

    /// Current balance of the account
    pub async fn balance(&self, account: AccountId) -> Result<Decimal, LedgerError> {
        self.store
            .find_account(account)
            .await?
            .map(|account| account.balance)
            .ok_or_else(|| LedgerError::account_not_found(account))
    }

    /// Every recorded attempt on the account, oldest first
    pub async fn history(&self, account: AccountId) -> Result<Vec<Transaction>, LedgerError> {
        self.store.transactions_for_account(account).await
    }

    async fn movement(
        &self,
        ctx: &ExecutionContext,
        tx_type: TransactionType,
        account: AccountId,
        amount: Decimal,
    ) -> Result<Transaction, LedgerError> {
        self.locks
            .execute_with_lock(ctx, account, move || self.apply(ctx, tx_type, account, amount))
            .await
    }

    async fn apply(
        &self,
        ctx: &ExecutionContext,
        tx_type: TransactionType,
        id: AccountId,
        amount: Decimal,
    ) -> Result<Transaction, LedgerError> {
        let mut unit = self.store.begin().await?;
        let mut account = unit
            .find_account(id)
            .await?
            .ok_or_else(|| LedgerError::account_not_found(id))?;
        if !account.is_active() {
            return Err(LedgerError::account_unavailable(id, account.state));
        }

        let entry = self
            .engine
            .execute(ctx, unit.as_mut(), tx_type, &mut account, amount, None)
            .await?;
        unit.save_account(&account).await?;
        unit.commit().await?;
        Ok(entry)
    }
}
