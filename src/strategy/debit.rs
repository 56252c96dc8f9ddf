//! Withdrawal and fee strategies
//!
//! Both debit the account and share the inclusive sufficiency check
//! (`balance >= amount`), which runs before the balance is touched.

use rust_decimal::Decimal;

use super::{debit, ensure_positive, TransactionStrategy};
use crate::types::{Account, LedgerError, TransactionType};

/// Debits a positive amount from the account
#[derive(Debug, Clone, Copy, Default)]
pub struct WithdrawalStrategy;

impl TransactionStrategy for WithdrawalStrategy {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::Withdrawal
    }

    fn apply(&self, account: &mut Account, amount: Decimal) -> Result<Decimal, LedgerError> {
        ensure_positive(amount)?;
        debit(account, amount)
    }

    fn signed_amount(&self, amount: Decimal) -> Decimal {
        -amount
    }
}

/// Debits a fee from the account
///
/// A zero fee is allowed and recorded; negative fees are not.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeeStrategy;

impl TransactionStrategy for FeeStrategy {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::Fee
    }

    fn apply(&self, account: &mut Account, amount: Decimal) -> Result<Decimal, LedgerError> {
        if amount < Decimal::ZERO {
            return Err(LedgerError::invalid_amount(amount));
        }
        debit(account, amount)
    }

    fn signed_amount(&self, amount: Decimal) -> Decimal {
        -amount
    }
}
