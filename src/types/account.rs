//! Account-related types for the remittance ledger
//!
//! This module defines the Account structure together with its type and
//! lifecycle state. Accounts are never physically deleted; closing an account
//! is a state transition.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account identifier
pub type AccountId = u64;

/// Identifier of the client owning accounts and schedules
pub type ClientId = u64;

/// Scale used for every monetary amount in the ledger (2 decimal places)
pub const MONEY_SCALE: u32 = 2;

/// Product type of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Deposit,
    Savings,
    Loan,
    Investment,
}

/// Lifecycle state of an account
///
/// Only `Active` accounts accept balance mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountState {
    Active,
    Dormant,
    Suspended,
    Closed,
    Pending,
}

impl fmt::Display for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccountState::Active => "active",
            AccountState::Dormant => "dormant",
            AccountState::Suspended => "suspended",
            AccountState::Closed => "closed",
            AccountState::Pending => "pending",
        };
        f.write_str(name)
    }
}

/// Ledger account
///
/// The balance is a fixed-point amount with two decimal places. It is only
/// mutated through the transaction strategies, and is never negative after a
/// committed withdrawal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Account identity
    pub id: AccountId,

    /// Owning client
    pub client: ClientId,

    /// Current balance, scale 2
    pub balance: Decimal,

    /// ISO currency code the balance is held in
    pub currency: String,

    /// Product type
    pub account_type: AccountType,

    /// Lifecycle state
    pub state: AccountState,

    /// Optimistic concurrency version
    ///
    /// Incremented by the ledger store on every committed save. A unit of work
    /// that read version `n` can only commit while the stored version is still `n`.
    pub version: u64,
}

impl Account {
    /// Create a new active deposit account with the given opening balance
    ///
    /// # Arguments
    ///
    /// * `id` - Account identity
    /// * `client` - Owning client
    /// * `balance` - Opening balance, rounded to two decimal places
    /// * `currency` - ISO currency code
    pub fn new(id: AccountId, client: ClientId, balance: Decimal, currency: &str) -> Self {
        Account {
            id,
            client,
            balance: balance.round_dp(MONEY_SCALE),
            currency: currency.to_string(),
            account_type: AccountType::Deposit,
            state: AccountState::Active,
            version: 0,
        }
    }

    /// Whether this account currently accepts balance mutations
    pub fn is_active(&self) -> bool {
        self.state == AccountState::Active
    }
}
