//! Transaction strategy module
//!
//! This module defines the Strategy pattern for money movements. Each
//! [`TransactionType`] has one strategy holding its balance rule; the
//! [`StrategyRegistry`] maps types to strategies and is assembled once at
//! startup from an explicit list.
//!
//! Strategies only mutate the in-memory account. Recording the outcome (one
//! SUCCESS or FAILURE transaction per attempt) is the job of
//! [`crate::core::TransactionEngine`], so the same rules serve every caller.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{Account, LedgerError, TransactionType, MONEY_SCALE};

pub mod credit;
pub mod debit;
pub mod exchange;

pub use credit::DepositStrategy;
pub use debit::{FeeStrategy, WithdrawalStrategy};
pub use exchange::ExchangeLegStrategy;

/// Balance rule for one transaction type
pub trait TransactionStrategy: Send + Sync {
    /// The type this strategy handles
    fn transaction_type(&self) -> TransactionType;

    /// Apply the movement of `amount` to `account`
    ///
    /// # Returns
    ///
    /// The signed delta applied to the balance (positive for credits).
    ///
    /// # Errors
    ///
    /// Returns an error without touching the balance when the movement is not
    /// allowed (insufficient funds, invalid amount, overflow).
    fn apply(&self, account: &mut Account, amount: Decimal) -> Result<Decimal, LedgerError>;

    /// The signed amount this strategy would record for `amount`
    ///
    /// Used for FAILURE entries, where the movement never happened.
    fn signed_amount(&self, amount: Decimal) -> Decimal;
}

/// Mapping from transaction type to its strategy
#[derive(Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<TransactionType, Arc<dyn TransactionStrategy>>,
}

impl StrategyRegistry {
    /// Build a registry from an explicit list of strategies
    ///
    /// A later strategy for the same type replaces an earlier one.
    pub fn new(strategies: Vec<Arc<dyn TransactionStrategy>>) -> Self {
        let strategies = strategies
            .into_iter()
            .map(|strategy| (strategy.transaction_type(), strategy))
            .collect();
        Self { strategies }
    }

    /// Registry with deposit, withdrawal, fee and exchange-leg strategies
    pub fn standard() -> Self {
        Self::new(vec![
            Arc::new(DepositStrategy),
            Arc::new(WithdrawalStrategy),
            Arc::new(FeeStrategy),
            Arc::new(ExchangeLegStrategy),
        ])
    }

    /// Look up the strategy for `tx_type`
    ///
    /// # Errors
    ///
    /// `UnknownTransactionType` if no strategy was registered for the type.
    pub fn get(&self, tx_type: TransactionType) -> Result<Arc<dyn TransactionStrategy>, LedgerError> {
        self.strategies
            .get(&tx_type)
            .cloned()
            .ok_or_else(|| LedgerError::unknown_transaction_type(tx_type))
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Add `amount` to the balance with overflow checking
pub(crate) fn credit(account: &mut Account, amount: Decimal) -> Result<Decimal, LedgerError> {
    ensure_money_scale(amount)?;
    account.balance = account
        .balance
        .checked_add(amount)
        .ok_or_else(|| LedgerError::invalid_amount(amount))?;
    Ok(amount)
}

/// Subtract `amount` from the balance after the `balance >= amount` check
pub(crate) fn debit(account: &mut Account, amount: Decimal) -> Result<Decimal, LedgerError> {
    ensure_money_scale(amount)?;
    if account.balance < amount {
        return Err(LedgerError::insufficient_funds(
            account.id,
            account.balance,
            amount,
        ));
    }
    account.balance = account
        .balance
        .checked_sub(amount)
        .ok_or_else(|| LedgerError::invalid_amount(amount))?;
    Ok(-amount)
}

/// Reject zero and negative amounts, and amounts finer than a cent
pub(crate) fn ensure_positive(amount: Decimal) -> Result<(), LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::invalid_amount(amount));
    }
    ensure_money_scale(amount)
}

/// Reject amounts with more than [`MONEY_SCALE`] significant decimal places
///
/// Trailing zeros do not count, so `1.2300` is accepted as `1.23`.
pub(crate) fn ensure_money_scale(amount: Decimal) -> Result<(), LedgerError> {
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(LedgerError::invalid_amount(amount));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::deposit(TransactionType::Deposit)]
    #[case::withdrawal(TransactionType::Withdrawal)]
    #[case::fee(TransactionType::Fee)]
    #[case::exchange(TransactionType::Exchange)]
    fn test_standard_registry_resolves_every_type(#[case] tx_type: TransactionType) {
        let registry = StrategyRegistry::standard();
        let strategy = registry.get(tx_type).unwrap();
        assert_eq!(strategy.transaction_type(), tx_type);
    }

    #[test]
    fn test_missing_strategy_is_unknown_type() {
        let registry = StrategyRegistry::new(vec![Arc::new(DepositStrategy)]);

        let err = registry.get(TransactionType::Fee).err().unwrap();
        assert_eq!(err, LedgerError::unknown_transaction_type("fee"));
        assert_eq!(registry.len(), 1);
    }

    #[rstest]
    #[case::whole(Decimal::new(5, 0), true)]
    #[case::cents(Decimal::new(123, 2), true)]
    #[case::trailing_zeros(Decimal::new(12300, 4), true)]
    #[case::sub_cent(Decimal::new(12345, 4), false)]
    #[case::negative_sub_cent(Decimal::new(-1, 3), false)]
    fn test_money_scale(#[case] amount: Decimal, #[case] accepted: bool) {
        assert_eq!(ensure_money_scale(amount).is_ok(), accepted);
    }

    #[rstest]
    #[case::credit(true)]
    #[case::debit(false)]
    fn test_sub_cent_movement_leaves_balance_untouched(#[case] is_credit: bool) {
        let mut account = Account::new(1, 1, Decimal::new(100, 0), "KRW");
        let amount = Decimal::new(12345, 4);

        let result = if is_credit {
            credit(&mut account, amount)
        } else {
            debit(&mut account, amount)
        };

        assert_eq!(result.unwrap_err(), LedgerError::invalid_amount(amount));
        assert_eq!(account.balance, Decimal::new(100, 0));
    }

    #[test]
    fn test_debit_check_is_inclusive() {
        let mut account = Account::new(1, 1, Decimal::new(100, 0), "KRW");

        let delta = debit(&mut account, Decimal::new(100, 0)).unwrap();

        assert_eq!(delta, Decimal::new(-100, 0));
        assert_eq!(account.balance, Decimal::ZERO);
    }

    #[test]
    fn test_debit_failure_leaves_balance_untouched() {
        let mut account = Account::new(1, 1, Decimal::new(99, 0), "KRW");

        let err = debit(&mut account, Decimal::new(100, 0)).unwrap_err();

        assert_eq!(
            err,
            LedgerError::insufficient_funds(1, Decimal::new(99, 0), Decimal::new(100, 0))
        );
        assert_eq!(account.balance, Decimal::new(99, 0));
    }
}
