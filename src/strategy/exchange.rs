//! Exchange-leg strategy
//!
//! A currency exchange is two legs on two accounts: a negative leg debiting the
//! source account and a positive leg crediting the target account.

use rust_decimal::Decimal;

use super::{credit, debit, TransactionStrategy};
use crate::types::{Account, LedgerError, TransactionType};

/// Applies one signed exchange leg
#[derive(Debug, Clone, Copy, Default)]
pub struct ExchangeLegStrategy;

impl TransactionStrategy for ExchangeLegStrategy {
    fn transaction_type(&self) -> TransactionType {
        TransactionType::Exchange
    }

    fn apply(&self, account: &mut Account, amount: Decimal) -> Result<Decimal, LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::invalid_amount(amount));
        }
        if amount.is_sign_negative() {
            debit(account, amount.abs())
        } else {
            credit(account, amount)
        }
    }

    fn signed_amount(&self, amount: Decimal) -> Decimal {
        amount
    }
}
