use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::io::SeedFiles;
use crate::types::ScheduleKind;

/// Run standing remittance instructions over a seeded ledger
#[derive(Parser, Debug)]
#[command(name = "remittance-ledger")]
#[command(about = "Execute scheduled overseas remittances", long_about = None)]
pub struct CliArgs {
    /// Runtime worker threads
    #[arg(long = "workers", value_name = "COUNT", global = true)]
    pub workers: Option<usize>,

    /// Emit JSON log lines
    #[arg(long = "json-logs", global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one scheduler job and print final balances as CSV
    Run {
        #[arg(value_name = "JOB")]
        job: JobKind,

        /// Business date of the run (default: today)
        #[arg(long = "date", value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,

        #[command(flatten)]
        seed: SeedArgs,
    },

    /// Run both jobs on their cron triggers until Ctrl-C
    Serve {
        #[command(flatten)]
        seed: SeedArgs,
    },
}

/// Scheduler job selectable on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum JobKind {
    Monthly,
    Weekly,
}

impl From<JobKind> for ScheduleKind {
    fn from(job: JobKind) -> Self {
        match job {
            JobKind::Monthly => ScheduleKind::Monthly,
            JobKind::Weekly => ScheduleKind::Weekly,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct SeedArgs {
    /// Accounts CSV: id, client, currency, balance[, state]
    #[arg(long = "accounts", value_name = "FILE")]
    pub accounts: PathBuf,

    /// Standing instructions CSV
    #[arg(long = "schedules", value_name = "FILE")]
    pub schedules: Option<PathBuf>,

    /// Recipients CSV
    #[arg(long = "recipients", value_name = "FILE")]
    pub recipients: Option<PathBuf>,

    /// Fee policies CSV
    #[arg(long = "fees", value_name = "FILE")]
    pub fees: Option<PathBuf>,

    /// Exchange rates CSV: currency, rate (price in the base currency)
    #[arg(long = "rates", value_name = "FILE")]
    pub rates: Option<PathBuf>,
}

impl From<SeedArgs> for SeedFiles {
    fn from(args: SeedArgs) -> Self {
        SeedFiles {
            accounts: args.accounts,
            schedules: args.schedules,
            recipients: args.recipients,
            fees: args.fees,
            rates: args.rates,
        }
    }
}

impl CliArgs {
    /// Worker threads for the runtime; zero falls back to the CPU count
    pub fn worker_threads(&self) -> usize {
        match self.workers {
            Some(0) | None => num_cpus::get(),
            Some(workers) => workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::monthly(&["program", "run", "monthly", "--accounts", "a.csv"], JobKind::Monthly)]
    #[case::weekly(&["program", "run", "weekly", "--accounts", "a.csv"], JobKind::Weekly)]
    fn test_job_parsing(#[case] args: &[&str], #[case] expected: JobKind) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        match parsed.command {
            Command::Run { job, .. } => assert_eq!(job, expected),
            other => panic!("Expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_run_with_every_option() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--workers",
            "4",
            "run",
            "monthly",
            "--date",
            "2026-03-09",
            "--accounts",
            "a.csv",
            "--schedules",
            "s.csv",
            "--recipients",
            "r.csv",
            "--fees",
            "f.csv",
            "--rates",
            "x.csv",
            "--json-logs",
        ])
        .unwrap();

        assert_eq!(parsed.worker_threads(), 4);
        assert!(parsed.json_logs);
        let Command::Run { date, seed, .. } = parsed.command else {
            panic!("Expected run");
        };
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 9));
        let files = SeedFiles::from(seed);
        assert_eq!(files.schedules, Some(PathBuf::from("s.csv")));
        assert_eq!(files.rates, Some(PathBuf::from("x.csv")));
    }

    #[rstest]
    #[case::unset(&["program", "serve", "--accounts", "a.csv"], num_cpus::get())]
    #[case::zero(&["program", "--workers", "0", "serve", "--accounts", "a.csv"], num_cpus::get())]
    #[case::explicit(&["program", "serve", "--accounts", "a.csv", "--workers", "2"], 2)]
    fn test_worker_threads(#[case] args: &[&str], #[case] expected: usize) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.worker_threads(), expected);
    }

    #[rstest]
    #[case::missing_command(&["program"])]
    #[case::missing_accounts(&["program", "run", "monthly"])]
    #[case::invalid_job(&["program", "run", "daily", "--accounts", "a.csv"])]
    #[case::invalid_date(&["program", "run", "monthly", "--date", "03/09/2026", "--accounts", "a.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
