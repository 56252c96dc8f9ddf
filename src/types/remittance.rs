//! Remittance types: recipients, fee policies, fee records and executions
//!
//! An `OverseasRemittance` is one executed transfer. It references the fee
//! record computed for it and, for scheduled transfers, the regular remittance
//! that produced it.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::account::{AccountId, MONEY_SCALE};
use super::error::LedgerError;
use super::schedule::ScheduleId;

pub type RecipientId = u64;
pub type FeePolicyId = u64;
pub type RemittanceId = Uuid;
pub type FeeRecordId = Uuid;

/// Payee of a remittance
///
/// Recipients are shared by remittances and schedules and are deduplicated by
/// their [`RecipientIdentity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: RecipientId,
    pub name: String,
    pub bank_code: String,
    pub account_number: String,
    pub country: String,
    pub currency: String,
}

impl Recipient {
    pub fn identity(&self) -> RecipientIdentity {
        RecipientIdentity {
            bank_code: self.bank_code.clone(),
            account_number: self.account_number.clone(),
            name: self.name.clone(),
        }
    }
}

/// Deduplication key of a recipient
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipientIdentity {
    pub bank_code: String,
    pub account_number: String,
    pub name: String,
}

/// Lookup criteria for a recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipientQuery {
    ById(RecipientId),
    ByIdentity(RecipientIdentity),
}

impl fmt::Display for RecipientQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipientQuery::ById(id) => write!(f, "{id}"),
            RecipientQuery::ByIdentity(identity) => write!(
                f,
                "{}/{}/{}",
                identity.bank_code, identity.account_number, identity.name
            ),
        }
    }
}

/// Fee policy applied to remittances
///
/// The total fee for a send amount is `flat_fee + network_fee + amount * rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemittanceFee {
    pub id: FeePolicyId,

    /// Flat tier fee
    pub flat_fee: Decimal,

    /// Percentage fee as a fraction (0.01 = 1%)
    pub rate: Decimal,

    /// Fixed network (correspondent bank) fee
    pub network_fee: Decimal,
}

/// Fee computed for one remittance; immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeRecord {
    pub id: FeeRecordId,
    pub policy: FeePolicyId,

    /// Amount-independent part: flat tier plus network fee
    pub base_fee: Decimal,

    /// Amount-dependent part: `send_amount * rate`, scale 2
    pub variable_fee: Decimal,

    /// `base_fee + variable_fee`
    pub total_fee: Decimal,
}

impl FeeRecord {
    /// Compute the fee for sending `send_amount` under `policy`
    pub fn compute(policy: &RemittanceFee, send_amount: Decimal) -> Self {
        let base_fee = (policy.flat_fee + policy.network_fee).round_dp(MONEY_SCALE);
        let variable_fee = (send_amount * policy.rate).round_dp(MONEY_SCALE);
        FeeRecord {
            id: Uuid::new_v4(),
            policy: policy.id,
            base_fee,
            variable_fee,
            total_fee: base_fee + variable_fee,
        }
    }
}

/// Status of one remittance execution
///
/// Advances monotonically `Requested → Pending → Processing → Completed`.
/// `Failed` is reachable from any non-completed status, and only an explicit
/// retry moves a failed remittance back to `Requested`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RemittanceStatus {
    Requested,
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RemittanceStatus {
    fn rank(self) -> u8 {
        match self {
            RemittanceStatus::Requested => 0,
            RemittanceStatus::Pending => 1,
            RemittanceStatus::Processing => 2,
            RemittanceStatus::Completed => 3,
            RemittanceStatus::Failed => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RemittanceStatus::Completed | RemittanceStatus::Failed)
    }

    /// Whether a forward transition from `self` to `next` is allowed
    pub fn can_advance_to(self, next: RemittanceStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.rank() > self.rank()
    }
}

impl fmt::Display for RemittanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemittanceStatus::Requested => "REQUESTED",
            RemittanceStatus::Pending => "PENDING",
            RemittanceStatus::Processing => "PROCESSING",
            RemittanceStatus::Completed => "COMPLETED",
            RemittanceStatus::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// One executed overseas transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverseasRemittance {
    pub id: RemittanceId,
    pub account: AccountId,
    pub recipient: RecipientId,
    pub fee_record: FeeRecordId,

    /// Parent schedule for scheduled executions
    pub schedule: Option<ScheduleId>,

    pub from_currency: String,
    pub to_currency: String,

    /// Units of `to_currency` per unit of `from_currency`
    pub exchange_rate: Decimal,

    pub send_amount: Decimal,
    pub receive_amount: Decimal,
    pub total_fee: Decimal,

    /// `send_amount + total_fee`, the amount debited from the account
    pub total_deduction: Decimal,

    pub status: RemittanceStatus,
    pub effective_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl OverseasRemittance {
    /// Move the remittance forward to `next`
    ///
    /// # Errors
    ///
    /// `InvalidStatusTransition` if the move would regress the status or leave a
    /// terminal status.
    pub fn advance(&mut self, next: RemittanceStatus) -> Result<(), LedgerError> {
        if !self.status.can_advance_to(next) {
            return Err(LedgerError::invalid_status_transition(self.status, next));
        }
        self.status = next;
        Ok(())
    }

    /// Explicit retry of a failed remittance
    pub fn retry(&mut self) -> Result<(), LedgerError> {
        if self.status != RemittanceStatus::Failed {
            return Err(LedgerError::invalid_status_transition(
                self.status,
                RemittanceStatus::Requested,
            ));
        }
        self.status = RemittanceStatus::Requested;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn policy() -> RemittanceFee {
        RemittanceFee {
            id: 1,
            flat_fee: Decimal::new(5000, 0),
            rate: Decimal::new(1, 2),
            network_fee: Decimal::new(2500, 0),
        }
    }

    #[test]
    fn test_fee_record_sums_base_and_variable() {
        let record = FeeRecord::compute(&policy(), Decimal::new(100_000, 0));

        assert_eq!(record.base_fee, Decimal::new(7500, 0));
        assert_eq!(record.variable_fee, Decimal::new(1000, 0));
        assert_eq!(record.total_fee, Decimal::new(8500, 0));
        assert_eq!(record.policy, 1);
    }

    #[test]
    fn test_variable_fee_is_rounded_to_cents() {
        let record = FeeRecord::compute(&policy(), Decimal::new(333, 2));
        assert_eq!(record.variable_fee, Decimal::new(3, 2));
    }

    #[rstest]
    #[case::forward(RemittanceStatus::Requested, RemittanceStatus::Pending, true)]
    #[case::skip_ahead(RemittanceStatus::Requested, RemittanceStatus::Completed, true)]
    #[case::regress(RemittanceStatus::Processing, RemittanceStatus::Pending, false)]
    #[case::same(RemittanceStatus::Pending, RemittanceStatus::Pending, false)]
    #[case::fail(RemittanceStatus::Processing, RemittanceStatus::Failed, true)]
    #[case::after_completed(RemittanceStatus::Completed, RemittanceStatus::Failed, false)]
    #[case::after_failed(RemittanceStatus::Failed, RemittanceStatus::Completed, false)]
    fn test_status_transitions(
        #[case] from: RemittanceStatus,
        #[case] to: RemittanceStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_advance_to(to), allowed);
    }

    #[test]
    fn test_retry_only_from_failed() {
        let mut remittance = OverseasRemittance {
            id: Uuid::new_v4(),
            account: 1,
            recipient: 1,
            fee_record: Uuid::new_v4(),
            schedule: None,
            from_currency: "KRW".to_string(),
            to_currency: "USD".to_string(),
            exchange_rate: Decimal::ONE,
            send_amount: Decimal::ONE,
            receive_amount: Decimal::ONE,
            total_fee: Decimal::ZERO,
            total_deduction: Decimal::ONE,
            status: RemittanceStatus::Pending,
            effective_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            created_at: Utc::now(),
        };

        assert!(remittance.retry().is_err());
        remittance.advance(RemittanceStatus::Failed).unwrap();
        remittance.retry().unwrap();
        assert_eq!(remittance.status, RemittanceStatus::Requested);
    }
}
