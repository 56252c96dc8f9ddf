//! Deposit strategy

use rust_decimal::Decimal;

use super::{credit, ensure_positive, TransactionStrategy};
use crate::types::{Account, LedgerError, TransactionType};

/// Credits a positive amount to the account
#[derive(Debug, Clone, Copy, Default)]
pub struct DepositStrategy;

impl TransactionStrategy for DepositStrategy {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::Deposit
    }

    fn apply(&self, account: &mut Account, amount: Decimal) -> Result<Decimal, LedgerError> {
        ensure_positive(amount)?;
        credit(account, amount)
    }

    fn signed_amount(&self, amount: Decimal) -> Decimal {
        amount
    }
}
