//! Transaction-related types for the remittance ledger
//!
//! A `Transaction` is the immutable audit entry for one attempted money
//! movement. Exactly one is written per attempt, tagged SUCCESS or FAILURE.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::account::AccountId;
use super::error::LedgerError;

/// Transaction identifier
pub type TransactionId = Uuid;

/// Money movement types supported by the strategy engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Credit funds to an account
    Deposit,

    /// Debit funds from an account; requires `balance >= amount`
    Withdrawal,

    /// Debit a fee from an account; requires `balance >= amount`
    Fee,

    /// One leg of a currency exchange
    ///
    /// A positive amount credits the account, a negative amount debits it
    /// (with the same sufficiency check as a withdrawal).
    Exchange,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Fee => "fee",
            TransactionType::Exchange => "exchange",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "deposit" => Ok(TransactionType::Deposit),
            "withdrawal" => Ok(TransactionType::Withdrawal),
            "fee" => Ok(TransactionType::Fee),
            "exchange" => Ok(TransactionType::Exchange),
            other => Err(LedgerError::unknown_transaction_type(other)),
        }
    }
}

/// Outcome recorded on a transaction entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Success,
    Failure,
}

/// Immutable ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,

    /// Account the movement was attempted against
    pub account: AccountId,

    pub tx_type: TransactionType,

    pub status: TransactionStatus,

    /// Signed amount: positive for credits, negative for debits
    ///
    /// Failure entries carry the attempted amount with the sign it would have had.
    pub amount: Decimal,

    /// Balance snapshot after the movement (unchanged balance for failures)
    pub balance_after: Decimal,

    /// Business reference, e.g. the remittance id the movement belongs to
    pub reference_id: Option<String>,

    /// Correlation id of the operation that produced the entry
    pub correlation_id: Uuid,

    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Build a SUCCESS entry
    pub fn success(
        account: AccountId,
        tx_type: TransactionType,
        amount: Decimal,
        balance_after: Decimal,
        reference_id: Option<String>,
        correlation_id: Uuid,
    ) -> Self {
        Self::entry(
            account,
            tx_type,
            TransactionStatus::Success,
            amount,
            balance_after,
            reference_id,
            correlation_id,
        )
    }

    /// Build a FAILURE entry
    pub fn failure(
        account: AccountId,
        tx_type: TransactionType,
        amount: Decimal,
        balance_after: Decimal,
        reference_id: Option<String>,
        correlation_id: Uuid,
    ) -> Self {
        Self::entry(
            account,
            tx_type,
            TransactionStatus::Failure,
            amount,
            balance_after,
            reference_id,
            correlation_id,
        )
    }

    fn entry(
        account: AccountId,
        tx_type: TransactionType,
        status: TransactionStatus,
        amount: Decimal,
        balance_after: Decimal,
        reference_id: Option<String>,
        correlation_id: Uuid,
    ) -> Self {
        Transaction {
            id: Uuid::new_v4(),
            account,
            tx_type,
            status,
            amount,
            balance_after,
            reference_id,
            correlation_id,
            created_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TransactionStatus::Success
    }
}
