//! Remittance Ledger CLI
//!
//! # Usage
//!
//! ```bash
//! remittance-ledger run monthly --date 2026-03-09 \
//!     --accounts accounts.csv --schedules schedules.csv \
//!     --recipients recipients.csv --fees fees.csv --rates rates.csv > balances.csv
//! remittance-ledger serve --accounts accounts.csv --schedules schedules.csv ...
//! ```
//!
//! `run` executes one job over the seeded ledger and prints final balances.
//! `serve` runs both jobs on their cron triggers until Ctrl-C.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (bad configuration, unreadable seed file, aborted run)

use anyhow::Context;
use chrono::Local;
use std::sync::Arc;

use remittance_ledger::app::{lock_manager_from_config, LedgerServices};
use remittance_ledger::cli::{self, Command, SeedArgs};
use remittance_ledger::config::Config;
use remittance_ledger::core::InMemoryLedger;
use remittance_ledger::io::{load_seed, write_accounts_csv, SeedFiles};
use remittance_ledger::logging;
use remittance_ledger::types::ExecutionContext;

fn main() -> anyhow::Result<()> {
    let args = cli::parse_args();
    let config = Config::from_env().context("invalid LEDGER_ configuration")?;
    logging::init_logging(args.json_logs || config.log_json)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.worker_threads())
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(async move {
        match args.command {
            Command::Run { job, date, seed } => {
                let today = date.unwrap_or_else(|| Local::now().date_naive());
                let (ledger, services) = setup(&config, seed).await?;

                let report = services
                    .scheduler
                    .run(&ExecutionContext::new(), job.into(), today)
                    .await?;
                tracing::info!(
                    executed = report.executed,
                    deferred = report.deferred,
                    failed = report.failed,
                    skipped = report.skipped,
                    "run complete"
                );

                let mut output = std::io::stdout();
                write_accounts_csv(&ledger.accounts(), &mut output).map_err(anyhow::Error::msg)?;
                anyhow::Ok(())
            }
            Command::Serve { seed } => {
                let (_ledger, services) = setup(&config, seed).await?;
                let ctx = ExecutionContext::new();

                let shutdown = ctx.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        tracing::info!("shutdown requested");
                        shutdown.cancel();
                    }
                });

                tracing::info!("scheduler started");
                services.scheduler.run_triggers(&ctx).await?;
                anyhow::Ok(())
            }
        }
    })
}

async fn setup(
    config: &Config,
    seed: SeedArgs,
) -> anyhow::Result<(Arc<InMemoryLedger>, LedgerServices)> {
    let ledger = Arc::new(InMemoryLedger::new());
    let (rates, _) = load_seed(&SeedFiles::from(seed), &ledger).await?;
    let lock_manager = lock_manager_from_config(config)?;

    let services = LedgerServices::build(config, ledger.clone(), lock_manager, Arc::new(rates));
    Ok((ledger, services))
}
