//! CSV format handling for seed data and account output
//!
//! Each seed file has its own record type. Records are deserialized as-is and
//! converted to domain types here, so the readers stay format-agnostic.
//!
//! | File | Columns |
//! |---|---|
//! | accounts | `id, client, currency, balance, state` (`state` optional) |
//! | recipients | `id, name, bank_code, account_number, country, currency` |
//! | fees | `id, flat_fee, rate, network_fee` |
//! | schedules | `id, account, client, recipient, fee_policy, from_currency, to_currency, amount, kind, day, status` (`status` optional) |
//! | rates | `currency, rate` |

use chrono::{Utc, Weekday};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;

use crate::types::{
    Account, AccountId, AccountState, ClientId, FeePolicyId, Recipient, RecipientId,
    RegularRemittance, RemittanceFee, Schedule, ScheduleId, ScheduleKind, ScheduleStatus,
};

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvAccount {
    pub id: AccountId,
    pub client: ClientId,
    pub currency: String,
    pub balance: Decimal,
    #[serde(default)]
    pub state: Option<AccountState>,
}

impl From<CsvAccount> for Account {
    fn from(record: CsvAccount) -> Self {
        let mut account = Account::new(record.id, record.client, record.balance, &record.currency);
        if let Some(state) = record.state {
            account.state = state;
        }
        account
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecipient {
    pub id: RecipientId,
    pub name: String,
    pub bank_code: String,
    pub account_number: String,
    pub country: String,
    pub currency: String,
}

impl From<CsvRecipient> for Recipient {
    fn from(record: CsvRecipient) -> Self {
        Recipient {
            id: record.id,
            name: record.name,
            bank_code: record.bank_code,
            account_number: record.account_number,
            country: record.country,
            currency: record.currency,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvFee {
    pub id: FeePolicyId,
    pub flat_fee: Decimal,
    pub rate: Decimal,
    pub network_fee: Decimal,
}

impl From<CsvFee> for RemittanceFee {
    fn from(record: CsvFee) -> Self {
        RemittanceFee {
            id: record.id,
            flat_fee: record.flat_fee,
            rate: record.rate,
            network_fee: record.network_fee,
        }
    }
}

/// Standing instruction row
///
/// `day` is a day of month (`1`..`31`) for monthly rows and a weekday name
/// (`mon`, `Friday`, ...) for weekly rows.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvSchedule {
    pub id: ScheduleId,
    pub account: AccountId,
    pub client: ClientId,
    pub recipient: RecipientId,
    pub fee_policy: FeePolicyId,
    pub from_currency: String,
    pub to_currency: String,
    pub amount: Decimal,
    pub kind: ScheduleKind,
    pub day: String,
    #[serde(default)]
    pub status: Option<ScheduleStatus>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRate {
    pub currency: String,
    pub rate: Decimal,
}

/// Convert a schedule row, validating its day
pub fn convert_csv_schedule(record: CsvSchedule) -> Result<RegularRemittance, String> {
    let day = record.day.trim();
    let schedule = match record.kind {
        ScheduleKind::Monthly => {
            let day_of_month = day.parse::<u32>().map_err(|_| {
                format!("Invalid day of month '{}' for schedule {}", day, record.id)
            })?;
            Schedule::monthly(day_of_month).map_err(|e| format!("Schedule {}: {}", record.id, e))?
        }
        ScheduleKind::Weekly => {
            let day_of_week = day
                .parse::<Weekday>()
                .map_err(|_| format!("Invalid weekday '{}' for schedule {}", day, record.id))?;
            Schedule::weekly(day_of_week)
        }
    };

    if record.amount <= Decimal::ZERO {
        return Err(format!(
            "Schedule {} requires a positive amount, got {}",
            record.id, record.amount
        ));
    }

    Ok(RegularRemittance {
        id: record.id,
        account: record.account,
        client: record.client,
        recipient: record.recipient,
        fee_policy: record.fee_policy,
        from_currency: record.from_currency,
        to_currency: record.to_currency,
        amount: record.amount,
        schedule,
        status: record.status.unwrap_or(ScheduleStatus::Active),
        created_at: Utc::now(),
    })
}

/// Write account balances as CSV
///
/// Columns: `id, client, currency, balance, state`, sorted by account id.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["id", "client", "currency", "balance", "state"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted = accounts.to_vec();
    sorted.sort_by_key(|account| account.id);

    for account in sorted {
        writer
            .write_record(&[
                account.id.to_string(),
                account.client.to_string(),
                account.currency.clone(),
                format!("{:.2}", account.balance),
                account.state.to_string(),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
