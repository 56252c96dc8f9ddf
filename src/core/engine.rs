//! Transaction processing engine
//!
//! This module provides the `TransactionEngine`, the single path through which
//! every balance movement runs. It resolves the strategy for the requested
//! [`TransactionType`], applies it to the caller's account, and records the
//! outcome.
//!
//! # Recording rule
//!
//! Every attempt produces exactly one [`Transaction`] entry:
//!
//! - **SUCCESS** entries are staged in the caller's unit of work, so they are
//!   committed or discarded together with the balance change.
//! - **FAILURE** entries are appended through the store directly. They survive
//!   the rollback of the unit that produced them, which is what keeps a
//!   record of rejected attempts.
//!
//! The engine never saves the account; the caller does that once all movements
//! of its unit are applied.

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::core::traits::{LedgerStore, UnitOfWork};
use crate::strategy::StrategyRegistry;
use crate::types::{Account, ExecutionContext, LedgerError, Transaction, TransactionType};

/// Strategy-driven transaction engine
///
/// Cheap to share behind an `Arc`; it holds no per-call state.
pub struct TransactionEngine {
    registry: StrategyRegistry,
    store: Arc<dyn LedgerStore>,
}

impl TransactionEngine {
    /// Create a new TransactionEngine
    ///
    /// # Arguments
    ///
    /// * `registry` - Strategies available to this engine
    /// * `store` - Store receiving FAILURE entries
    pub fn new(registry: StrategyRegistry, store: Arc<dyn LedgerStore>) -> Self {
        TransactionEngine { registry, store }
    }

    /// Engine with the standard deposit, withdrawal, fee and exchange strategies
    pub fn standard(store: Arc<dyn LedgerStore>) -> Self {
        Self::new(StrategyRegistry::standard(), store)
    }

    /// Apply one movement to `account` and record it
    ///
    /// # Arguments
    ///
    /// * `ctx` - Execution context; its correlation id is stamped on the entry
    /// * `unit` - Open unit of work receiving the SUCCESS entry
    /// * `tx_type` - Movement type, used to resolve the strategy
    /// * `account` - Account to mutate in memory
    /// * `amount` - Amount handed to the strategy
    /// * `reference_id` - Optional business reference (e.g. remittance id)
    ///
    /// # Returns
    ///
    /// The SUCCESS entry that was staged.
    ///
    /// # Errors
    ///
    /// - `UnknownTransactionType` if no strategy handles `tx_type`; nothing is recorded
    /// - `TransactionFailed` wrapping the strategy error, after the FAILURE
    ///   entry was written
    /// - Storage errors from staging the SUCCESS entry
    pub async fn execute(
        &self,
        ctx: &ExecutionContext,
        unit: &mut dyn UnitOfWork,
        tx_type: TransactionType,
        account: &mut Account,
        amount: Decimal,
        reference_id: Option<&str>,
    ) -> Result<Transaction, LedgerError> {
        let strategy = self.registry.get(tx_type)?;

        match strategy.apply(account, amount) {
            Ok(delta) => {
                let entry = Transaction::success(
                    account.id,
                    tx_type,
                    delta,
                    account.balance,
                    reference_id.map(str::to_string),
                    ctx.correlation_id(),
                );
                unit.append_transaction(entry.clone()).await?;
                tracing::debug!(
                    account = account.id,
                    tx_type = %tx_type,
                    amount = %delta,
                    balance = %account.balance,
                    "transaction applied"
                );
                Ok(entry)
            }
            Err(cause) => {
                let entry = Transaction::failure(
                    account.id,
                    tx_type,
                    strategy.signed_amount(amount),
                    account.balance,
                    reference_id.map(str::to_string),
                    ctx.correlation_id(),
                );
                if let Err(error) = self.store.append_transaction(entry).await {
                    tracing::error!(
                        account = account.id,
                        tx_type = %tx_type,
                        error = %error,
                        "failed to record failed transaction"
                    );
                }
                tracing::warn!(
                    account = account.id,
                    tx_type = %tx_type,
                    amount = %amount,
                    error = %cause,
                    "transaction rejected"
                );
                Err(LedgerError::transaction_failed(
                    tx_type, account.id, amount, cause,
                ))
            }
        }
    }
}
