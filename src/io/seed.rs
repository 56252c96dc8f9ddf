//! Seeding the in-memory ledger from CSV files

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::memory::InMemoryLedger;
use crate::core::rates::StaticRateProvider;
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::{
    convert_csv_schedule, CsvAccount, CsvFee, CsvRate, CsvRecipient, CsvSchedule,
};
use crate::types::LedgerError;

const SEED_BATCH_SIZE: usize = 1000;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Seed files; only accounts are required
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedFiles {
    pub accounts: PathBuf,
    pub schedules: Option<PathBuf>,
    pub recipients: Option<PathBuf>,
    pub fees: Option<PathBuf>,
    pub rates: Option<PathBuf>,
}

/// Number of rows loaded per file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub accounts: usize,
    pub schedules: usize,
    pub recipients: usize,
    pub fees: usize,
    pub rates: usize,
}

/// Load every seed file into `ledger`, returning the rate table
///
/// Unreadable rows are skipped with a warning; a missing file is an error.
pub async fn load_seed(
    files: &SeedFiles,
    ledger: &InMemoryLedger,
) -> Result<(StaticRateProvider, SeedSummary), SeedError> {
    let mut summary = SeedSummary::default();

    for record in read_file::<CsvAccount>(&files.accounts).await? {
        ledger.insert_account(record.into());
        summary.accounts += 1;
    }

    if let Some(path) = &files.recipients {
        for record in read_file::<CsvRecipient>(path).await? {
            ledger.insert_recipient(record.into());
            summary.recipients += 1;
        }
    }

    if let Some(path) = &files.fees {
        for record in read_file::<CsvFee>(path).await? {
            ledger.insert_fee_policy(record.into());
            summary.fees += 1;
        }
    }

    if let Some(path) = &files.schedules {
        for record in read_file::<CsvSchedule>(path).await? {
            match convert_csv_schedule(record) {
                Ok(schedule) => {
                    ledger.insert_schedule(schedule)?;
                    summary.schedules += 1;
                }
                Err(e) => tracing::warn!(error = %e, "skipping schedule row"),
            }
        }
    }

    let mut rates = StaticRateProvider::default();
    if let Some(path) = &files.rates {
        for record in read_file::<CsvRate>(path).await? {
            rates = rates.with_rate(&record.currency, record.rate);
            summary.rates += 1;
        }
    }

    tracing::info!(
        accounts = summary.accounts,
        schedules = summary.schedules,
        recipients = summary.recipients,
        fees = summary.fees,
        rates = summary.rates,
        "ledger seeded"
    );
    Ok((rates, summary))
}

async fn read_file<T>(path: &Path) -> Result<Vec<T>, SeedError>
where
    T: serde::de::DeserializeOwned + 'static,
{
    let mut reader = AsyncReader::<_, T>::open(path)
        .await
        .map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(reader.read_all(SEED_BATCH_SIZE).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::{ExchangeRateProvider, LedgerStore};
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_seed() {
        let accounts = csv_file("id,client,currency,balance\n1,7,KRW,100000\n");
        let fees = csv_file("id,flat_fee,rate,network_fee\n1,1000,0.01,500\n");
        let recipients = csv_file(
            "id,name,bank_code,account_number,country,currency\n4,Jane Doe,CHASUS33,000123,US,USD\n",
        );
        let schedules = csv_file(
            "id,account,client,recipient,fee_policy,from_currency,to_currency,amount,kind,day,status\n\
             1,1,7,4,1,KRW,USD,10000,monthly,25,\n\
             2,1,7,4,1,KRW,USD,10000,weekly,fri,PAUSED\n\
             3,1,7,4,1,KRW,USD,10000,monthly,40,\n",
        );
        let rates = csv_file("currency,rate\nKRW,1\nUSD,1250\n");

        let files = SeedFiles {
            accounts: accounts.path().to_path_buf(),
            schedules: Some(schedules.path().to_path_buf()),
            recipients: Some(recipients.path().to_path_buf()),
            fees: Some(fees.path().to_path_buf()),
            rates: Some(rates.path().to_path_buf()),
        };
        let ledger = InMemoryLedger::new();

        let (provider, summary) = load_seed(&files, &ledger).await.unwrap();

        assert_eq!(
            summary,
            SeedSummary {
                accounts: 1,
                schedules: 2,
                recipients: 1,
                fees: 1,
                rates: 2,
            }
        );
        assert_eq!(ledger.account(1).unwrap().balance, Decimal::new(100_000, 0));
        assert_eq!(ledger.find_regular_remittances_by_account(1).await.unwrap().len(), 2);
        assert_eq!(provider.rates().await.unwrap()["USD"], Decimal::new(1250, 0));
    }

    #[tokio::test]
    async fn test_missing_accounts_file_is_an_error() {
        let files = SeedFiles {
            accounts: PathBuf::from("missing/accounts.csv"),
            ..SeedFiles::default()
        };

        let err = load_seed(&files, &InMemoryLedger::new()).await.unwrap_err();
        assert!(matches!(err, SeedError::Io { .. }));
    }
}
