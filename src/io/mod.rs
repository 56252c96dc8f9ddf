//! I/O module
//!
//! - `csv_format` - Seed record types and account output
//! - `async_reader` - Batch CSV reader over any async source
//! - `seed` - Loading seed files into the in-memory ledger

pub mod async_reader;
pub mod csv_format;
pub mod seed;

pub use async_reader::AsyncReader;
pub use csv_format::{write_accounts_csv, CsvAccount, CsvFee, CsvRate, CsvRecipient, CsvSchedule};
pub use seed::{load_seed, SeedError, SeedFiles, SeedSummary};
