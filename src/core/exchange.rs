//! Currency exchange between two accounts of one client
//!
//! An exchange is two legs of [`TransactionType::Exchange`] in one unit of
//! work: a negative leg on the source account and a positive leg, converted at
//! the current rate, on the target account. Both account locks are held for
//! the duration.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::engine::TransactionEngine;
use crate::core::lock_coordinator::AccountLockCoordinator;
use crate::core::rates::conversion_rate;
use crate::core::traits::{ExchangeRateProvider, LedgerStore, UnitOfWork};
use crate::strategy::ensure_positive;
use crate::types::{
    Account, AccountId, ClientId, ExecutionContext, LedgerError, Transaction, TransactionType,
    MONEY_SCALE,
};

/// Outcome of a committed exchange
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeResult {
    /// Shared reference id stamped on both legs
    pub reference: Uuid,
    pub rate: Decimal,
    pub debited: Transaction,
    pub credited: Transaction,
}

pub struct ExchangeService {
    store: Arc<dyn LedgerStore>,
    engine: Arc<TransactionEngine>,
    locks: Arc<AccountLockCoordinator>,
    rates: Arc<dyn ExchangeRateProvider>,
}

impl ExchangeService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        engine: Arc<TransactionEngine>,
        locks: Arc<AccountLockCoordinator>,
        rates: Arc<dyn ExchangeRateProvider>,
    ) -> Self {
        ExchangeService {
            store,
            engine,
            locks,
            rates,
        }
    }

    /// Move `amount` out of `from` and its converted value into `to`
    ///
    /// # Errors
    ///
    /// - `SameAccount` if `from == to`
    /// - `Forbidden` if `client` does not own both accounts
    /// - `TransactionFailed` if the source cannot cover `amount`
    pub async fn exchange(
        &self,
        ctx: &ExecutionContext,
        client: ClientId,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<ExchangeResult, LedgerError> {
        if from == to {
            return Err(LedgerError::same_account(from));
        }
        ensure_positive(amount)?;

        self.locks
            .execute_with_locks(ctx, &[from, to], move || async move {
                let mut unit = self.store.begin().await?;
                let result = self
                    .exchange_in_unit(ctx, unit.as_mut(), client, from, to, amount)
                    .await?;
                unit.commit().await?;
                Ok(result)
            })
            .instrument(ctx.span("exchange"))
            .await
    }

    async fn exchange_in_unit(
        &self,
        ctx: &ExecutionContext,
        unit: &mut dyn UnitOfWork,
        client: ClientId,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<ExchangeResult, LedgerError> {
        let mut source = load_owned(unit, client, from).await?;
        let mut target = load_owned(unit, client, to).await?;

        let rates = self.rates.rates().await?;
        let rate = conversion_rate(&rates, &source.currency, &target.currency)?;
        let converted = (amount * rate).round_dp(MONEY_SCALE);
        if converted <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(converted));
        }

        let reference = Uuid::new_v4();
        let reference_id = reference.to_string();
        let debited = self
            .engine
            .execute(
                ctx,
                unit,
                TransactionType::Exchange,
                &mut source,
                -amount,
                Some(&reference_id),
            )
            .await?;
        let credited = self
            .engine
            .execute(
                ctx,
                unit,
                TransactionType::Exchange,
                &mut target,
                converted,
                Some(&reference_id),
            )
            .await?;

        unit.save_account(&source).await?;
        unit.save_account(&target).await?;

        tracing::info!(
            from,
            to,
            amount = %amount,
            converted = %converted,
            rate = %rate,
            "exchange applied"
        );

        Ok(ExchangeResult {
            reference,
            rate,
            debited,
            credited,
        })
    }
}

async fn load_owned(
    unit: &mut dyn UnitOfWork,
    client: ClientId,
    id: AccountId,
) -> Result<Account, LedgerError> {
    let account = unit
        .find_account(id)
        .await?
        .ok_or_else(|| LedgerError::account_not_found(id))?;
    if account.client != client {
        return Err(LedgerError::forbidden(client, format!("account {id}")));
    }
    if !account.is_active() {
        return Err(LedgerError::account_unavailable(id, account.state));
    }
    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LockConfig;
    use crate::core::memory::{InMemoryLedger, InMemoryLockManager};
    use crate::core::rates::StaticRateProvider;
    use crate::types::ErrorKind;
    use std::time::Duration;

    fn setup() -> (Arc<InMemoryLedger>, ExchangeService) {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.insert_account(Account::new(1, 7, Decimal::new(2_500_000, 0), "KRW"));
        ledger.insert_account(Account::new(2, 7, Decimal::ZERO, "USD"));
        ledger.insert_account(Account::new(3, 8, Decimal::ZERO, "USD"));

        let engine = Arc::new(TransactionEngine::standard(ledger.clone()));
        let locks = Arc::new(AccountLockCoordinator::new(
            Arc::new(InMemoryLockManager::new(Duration::from_millis(1))),
            LockConfig::default(),
        ));
        let rates = Arc::new(
            StaticRateProvider::default()
                .with_rate("KRW", Decimal::ONE)
                .with_rate("USD", Decimal::new(1250, 0)),
        );
        let service = ExchangeService::new(ledger.clone(), engine, locks, rates);
        (ledger, service)
    }

    #[tokio::test]
    async fn test_exchange_moves_converted_amount() {
        let (ledger, service) = setup();

        let result = service
            .exchange(&ExecutionContext::new(), 7, 1, 2, Decimal::new(1_250_000, 0))
            .await
            .unwrap();

        assert_eq!(result.debited.amount, Decimal::new(-1_250_000, 0));
        assert_eq!(result.credited.amount, Decimal::new(1000, 0));
        assert_eq!(ledger.account(1).unwrap().balance, Decimal::new(1_250_000, 0));
        assert_eq!(ledger.account(2).unwrap().balance, Decimal::new(1000, 0));
        assert_eq!(result.debited.reference_id, result.credited.reference_id);
    }

    #[tokio::test]
    async fn test_exchange_into_foreign_account_is_forbidden() {
        let (ledger, service) = setup();

        let err = service
            .exchange(&ExecutionContext::new(), 7, 1, 3, Decimal::new(1000, 0))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert_eq!(ledger.account(1).unwrap().balance, Decimal::new(2_500_000, 0));
        assert_eq!(ledger.transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_exchange_overdraw_leaves_both_accounts() {
        let (ledger, service) = setup();

        let err = service
            .exchange(&ExecutionContext::new(), 7, 1, 2, Decimal::new(3_000_000, 0))
            .await
            .unwrap_err();

        assert_eq!(err.root_kind(), ErrorKind::InsufficientFunds);
        assert_eq!(ledger.account(2).unwrap().balance, Decimal::ZERO);
        assert_eq!(ledger.transaction_count(), 1);
    }

    #[tokio::test]
    async fn test_exchange_to_same_account_is_rejected() {
        let (_, service) = setup();

        let err = service
            .exchange(&ExecutionContext::new(), 7, 1, 1, Decimal::ONE)
            .await
            .unwrap_err();

        assert_eq!(err, LedgerError::same_account(1));
    }
}
