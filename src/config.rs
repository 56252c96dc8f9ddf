//! Runtime configuration
//!
//! Configuration is read from `LEDGER_`-prefixed environment variables with
//! `envy`, after loading an optional `.env` file with `dotenvy`.
//!
//! # Environment Variables
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `LEDGER_REDIS_URL` | unset | Redis lock backend; in-process locks when unset |
//! | `LEDGER_LOCK_KEY_PREFIX` | `account:lock:` | Prefix of account lock names |
//! | `LEDGER_LOCK_WAIT_MS` | `3000` | Maximum wait for an account lock |
//! | `LEDGER_LOCK_LEASE_MS` | `10000` | Lease after which an unreleased lock expires |
//! | `LEDGER_LOCK_RETRY_MS` | `25` | Poll interval while waiting for a lock |
//! | `LEDGER_MONTHLY_CRON` | `0 0 9 * * *` | Trigger of the monthly job |
//! | `LEDGER_WEEKLY_CRON` | `0 0 10 * * *` | Trigger of the weekly job |
//! | `LEDGER_PAGE_SIZE` | `1000` | Schedules fetched per page |
//! | `LEDGER_MAX_CONCURRENCY` | CPU cores | Accounts processed concurrently per page |
//! | `LEDGER_HOLIDAYS` | empty | Comma-separated `YYYY-MM-DD` non-business days |
//! | `LEDGER_LOG_JSON` | `false` | Emit JSON log lines |

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

pub const DEFAULT_LOCK_KEY_PREFIX: &str = "account:lock:";
pub const DEFAULT_LOCK_WAIT_MS: u64 = 3_000;
pub const DEFAULT_LOCK_LEASE_MS: u64 = 10_000;
pub const DEFAULT_LOCK_RETRY_MS: u64 = 25;
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_MONTHLY_CRON: &str = "0 0 9 * * *";
pub const DEFAULT_WEEKLY_CRON: &str = "0 0 10 * * *";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub redis_url: Option<String>,

    #[serde(default = "default_lock_key_prefix")]
    pub lock_key_prefix: String,

    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: u64,

    #[serde(default = "default_lock_lease_ms")]
    pub lock_lease_ms: u64,

    #[serde(default = "default_lock_retry_ms")]
    pub lock_retry_ms: u64,

    #[serde(default = "default_monthly_cron")]
    pub monthly_cron: String,

    #[serde(default = "default_weekly_cron")]
    pub weekly_cron: String,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "num_cpus::get")]
    pub max_concurrency: usize,

    #[serde(default)]
    pub holidays: Vec<NaiveDate>,

    #[serde(default)]
    pub log_json: bool,
}

fn default_lock_key_prefix() -> String {
    DEFAULT_LOCK_KEY_PREFIX.to_string()
}

fn default_lock_wait_ms() -> u64 {
    DEFAULT_LOCK_WAIT_MS
}

fn default_lock_lease_ms() -> u64 {
    DEFAULT_LOCK_LEASE_MS
}

fn default_lock_retry_ms() -> u64 {
    DEFAULT_LOCK_RETRY_MS
}

fn default_monthly_cron() -> String {
    DEFAULT_MONTHLY_CRON.to_string()
}

fn default_weekly_cron() -> String {
    DEFAULT_WEEKLY_CRON.to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl Config {
    /// Load configuration from the environment
    ///
    /// A `.env` file is loaded first when present.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed("LEDGER_").from_env::<Config>()
    }

    /// Lock coordinator settings
    pub fn lock_config(&self) -> LockConfig {
        LockConfig::new(
            &self.lock_key_prefix,
            Duration::from_millis(self.lock_wait_ms),
            Duration::from_millis(self.lock_lease_ms),
            Duration::from_millis(self.lock_retry_ms),
        )
    }

    /// Scheduler settings
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::new(self.page_size, self.max_concurrency)
            .with_cron(&self.monthly_cron, &self.weekly_cron)
            .with_holidays(self.holidays.iter().copied())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            redis_url: None,
            lock_key_prefix: default_lock_key_prefix(),
            lock_wait_ms: DEFAULT_LOCK_WAIT_MS,
            lock_lease_ms: DEFAULT_LOCK_LEASE_MS,
            lock_retry_ms: DEFAULT_LOCK_RETRY_MS,
            monthly_cron: default_monthly_cron(),
            weekly_cron: default_weekly_cron(),
            page_size: DEFAULT_PAGE_SIZE,
            max_concurrency: num_cpus::get(),
            holidays: Vec::new(),
            log_json: false,
        }
    }
}

/// Account lock settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockConfig {
    /// Prefix prepended to the account id to form the lock name
    pub key_prefix: String,

    /// Maximum time to wait for a lock
    pub wait: Duration,

    /// Lease after which a lock expires even if never released
    pub lease: Duration,

    /// Poll interval while waiting
    pub retry_interval: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        LockConfig {
            key_prefix: DEFAULT_LOCK_KEY_PREFIX.to_string(),
            wait: Duration::from_millis(DEFAULT_LOCK_WAIT_MS),
            lease: Duration::from_millis(DEFAULT_LOCK_LEASE_MS),
            retry_interval: Duration::from_millis(DEFAULT_LOCK_RETRY_MS),
        }
    }
}

impl LockConfig {
    /// Create a LockConfig, replacing unusable values with defaults
    ///
    /// Zero durations and an empty prefix are logged and replaced.
    pub fn new(key_prefix: &str, wait: Duration, lease: Duration, retry_interval: Duration) -> Self {
        let default = Self::default();

        let key_prefix = if key_prefix.is_empty() {
            tracing::warn!(default = %default.key_prefix, "empty lock key prefix, using default");
            default.key_prefix
        } else {
            key_prefix.to_string()
        };

        LockConfig {
            key_prefix,
            wait: non_zero("lock wait", wait, default.wait),
            lease: non_zero("lock lease", lease, default.lease),
            retry_interval: non_zero("lock retry interval", retry_interval, default.retry_interval),
        }
    }
}

fn non_zero(name: &str, value: Duration, default: Duration) -> Duration {
    if value.is_zero() {
        tracing::warn!(setting = name, default_ms = default.as_millis() as u64, "invalid zero duration, using default");
        default
    } else {
        value
    }
}

/// Regular-remittance scheduler settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Schedules fetched per page
    pub page_size: usize,

    /// Accounts processed concurrently within a page
    pub max_concurrency: usize,

    pub monthly_cron: String,
    pub weekly_cron: String,

    /// Non-business days besides weekends
    pub holidays: HashSet<NaiveDate>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            page_size: DEFAULT_PAGE_SIZE,
            max_concurrency: num_cpus::get(),
            monthly_cron: DEFAULT_MONTHLY_CRON.to_string(),
            weekly_cron: DEFAULT_WEEKLY_CRON.to_string(),
            holidays: HashSet::new(),
        }
    }
}

impl SchedulerConfig {
    /// Create a SchedulerConfig with custom sizes
    ///
    /// Zero values are logged and replaced with defaults.
    pub fn new(page_size: usize, max_concurrency: usize) -> Self {
        let default = Self::default();

        let page_size = if page_size == 0 {
            tracing::warn!(page_size, default = default.page_size, "invalid page size, using default");
            default.page_size
        } else {
            page_size
        };

        let max_concurrency = if max_concurrency == 0 {
            tracing::warn!(
                max_concurrency,
                default = default.max_concurrency,
                "invalid max concurrency, using default"
            );
            default.max_concurrency
        } else {
            max_concurrency
        };

        SchedulerConfig {
            page_size,
            max_concurrency,
            ..default
        }
    }

    pub fn with_cron(mut self, monthly: &str, weekly: &str) -> Self {
        self.monthly_cron = monthly.to_string();
        self.weekly_cron = weekly.to_string();
        self
    }

    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }
}
