//! Regular (standing) remittance types
//!
//! A `RegularRemittance` is a schedule header shared by every cadence plus a
//! tagged [`Schedule`] describing when it fires. The scheduler dispatches on
//! the tag rather than on subtypes.

use chrono::{DateTime, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::account::{AccountId, ClientId};
use super::error::LedgerError;
use super::remittance::{FeePolicyId, RecipientId};

pub type ScheduleId = u64;

/// Status of a standing instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScheduleStatus {
    /// Fires on its due date
    Active,

    /// Deferred (weekend, holiday, or failed execution); re-driven on the next run
    Delayed,

    /// Suspended by the user; never touched by the scheduler
    Paused,
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScheduleStatus::Active => "ACTIVE",
            ScheduleStatus::Delayed => "DELAYED",
            ScheduleStatus::Paused => "PAUSED",
        };
        f.write_str(name)
    }
}

/// Cadence of a schedule, used to select which job scans it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Monthly,
    Weekly,
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleKind::Monthly => f.write_str("monthly"),
            ScheduleKind::Weekly => f.write_str("weekly"),
        }
    }
}

/// When a standing instruction fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Schedule {
    /// Fires on a fixed day of month (1..=31)
    Monthly { day_of_month: u32 },

    /// Fires on a fixed day of week
    Weekly { day_of_week: Weekday },
}

impl Schedule {
    /// Build a monthly schedule, validating the day range
    pub fn monthly(day_of_month: u32) -> Result<Self, LedgerError> {
        if !(1..=31).contains(&day_of_month) {
            return Err(LedgerError::InvalidSchedule(format!(
                "day of month must be within 1..=31, got {day_of_month}"
            )));
        }
        Ok(Schedule::Monthly { day_of_month })
    }

    pub fn weekly(day_of_week: Weekday) -> Self {
        Schedule::Weekly { day_of_week }
    }

    pub fn kind(&self) -> ScheduleKind {
        match self {
            Schedule::Monthly { .. } => ScheduleKind::Monthly,
            Schedule::Weekly { .. } => ScheduleKind::Weekly,
        }
    }

    /// Numeric key matched against a job's candidate set
    ///
    /// Day of month for monthly schedules, ISO weekday number (Monday = 1) for
    /// weekly schedules.
    pub fn day_key(&self) -> u32 {
        match self {
            Schedule::Monthly { day_of_month } => *day_of_month,
            Schedule::Weekly { day_of_week } => day_of_week.number_from_monday(),
        }
    }
}

/// Standing remittance instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegularRemittance {
    pub id: ScheduleId,
    pub account: AccountId,

    /// Owner, checked on every user-initiated change
    pub client: ClientId,

    pub recipient: RecipientId,
    pub fee_policy: FeePolicyId,
    pub from_currency: String,
    pub to_currency: String,
    pub amount: Decimal,
    pub schedule: Schedule,
    pub status: ScheduleStatus,
    pub created_at: DateTime<Utc>,
}

impl RegularRemittance {
    /// Whether `other` would register the same transfer twice
    pub fn conflicts_with(&self, other: &NewRegularRemittance) -> bool {
        self.account == other.account
            && self.recipient == other.recipient
            && self.schedule == other.schedule
    }
}

/// Registration payload for a new standing instruction
#[derive(Debug, Clone, PartialEq)]
pub struct NewRegularRemittance {
    pub account: AccountId,
    pub client: ClientId,
    pub recipient: RecipientId,
    pub fee_policy: FeePolicyId,
    pub from_currency: String,
    pub to_currency: String,
    pub amount: Decimal,
    pub schedule: Schedule,
}

/// User-editable fields of a standing instruction
///
/// `None` leaves the stored value alone. Status is not part of an update; it
/// moves only through conditional transitions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScheduleUpdate {
    pub amount: Option<Decimal>,
    pub schedule: Option<Schedule>,
}

impl ScheduleUpdate {
    /// Apply the set fields to `target`
    pub fn apply_to(&self, target: &mut RegularRemittance) {
        if let Some(amount) = self.amount {
            target.amount = amount;
        }
        if let Some(schedule) = self.schedule {
            target.schedule = schedule;
        }
    }
}

/// Filter used by the scheduler to find due schedules
#[derive(Debug, Clone, PartialEq)]
pub struct DueQuery {
    pub kind: ScheduleKind,

    /// Candidate day keys (see [`Schedule::day_key`])
    pub day_keys: Vec<u32>,

    /// Statuses eligible when the day key matches
    pub statuses: Vec<ScheduleStatus>,

    /// Also match every `Delayed` schedule of this kind regardless of its day
    pub include_delayed: bool,
}

impl DueQuery {
    /// Whether `schedule` satisfies this filter
    pub fn matches(&self, schedule: &RegularRemittance) -> bool {
        if schedule.schedule.kind() != self.kind {
            return false;
        }
        if self.include_delayed && schedule.status == ScheduleStatus::Delayed {
            return true;
        }
        self.day_keys.contains(&schedule.schedule.day_key())
            && self.statuses.contains(&schedule.status)
    }
}

/// Keyset page request: items with id strictly greater than `after`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub after: Option<ScheduleId>,
    pub size: usize,
}

impl PageRequest {
    pub fn first(size: usize) -> Self {
        PageRequest { after: None, size }
    }
}

/// One page of results ordered by id
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,

    /// Cursor for the next page; `None` when this is the last page
    pub next: Option<PageRequest>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}
