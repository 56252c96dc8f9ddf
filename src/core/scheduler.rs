//! Regular-remittance scheduler
//!
//! Drives standing remittance instructions through their status machine:
//!
//! ```text
//!            weekend / holiday                 weekday run
//! ACTIVE ───────────────────────▶ DELAYED ─────────────────────▶ executed ─▶ ACTIVE
//!   │                                ▲
//!   └──────── execution error ───────┘
//! PAUSED is never selected.
//! ```
//!
//! Every status write is a conditional transition in the store. A schedule
//! paused or deleted by its owner while a job holds it in a page keeps the
//! owner's change; the job counts it as skipped.
//!
//! # Paging
//!
//! Due schedules are read in fixed-size keyset pages ordered by schedule id,
//! so status changes made while a job runs never shift later pages. Within a
//! page, schedules are partitioned by account: different accounts are
//! processed concurrently, the schedules of one account sequentially.
//!
//! # Failure handling
//!
//! A failing schedule is logged and marked DELAYED; it never aborts the job.
//! Only a failure to read a page ends a run early.

use chrono::{Local, NaiveDate};
use cron::Schedule as CronSchedule;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use crate::config::SchedulerConfig;
use crate::core::calendar::{monthly_candidate_days, weekly_candidate_day, BusinessCalendar};
use crate::core::remittance::{RemittanceCommand, RemittanceService};
use crate::core::traits::LedgerStore;
use crate::types::{
    AccountId, DueQuery, ExecutionContext, LedgerError, PageRequest, RegularRemittance,
    ScheduleKind, ScheduleStatus,
};

/// Summary of one scheduler job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub kind: ScheduleKind,
    pub date: NaiveDate,

    /// Whether the job ran on a business day
    pub business_day: bool,

    pub pages: usize,
    pub scanned: usize,
    pub executed: usize,
    pub deferred: usize,
    pub failed: usize,

    /// Paused or deleted between the page read and its turn
    pub skipped: usize,
}

impl RunReport {
    fn new(kind: ScheduleKind, date: NaiveDate, business_day: bool) -> Self {
        RunReport {
            kind,
            date,
            business_day,
            pages: 0,
            scanned: 0,
            executed: 0,
            deferred: 0,
            failed: 0,
            skipped: 0,
        }
    }

    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Executed => self.executed += 1,
            ItemOutcome::Deferred => self.deferred += 1,
            ItemOutcome::Failed => self.failed += 1,
            ItemOutcome::Skipped => self.skipped += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemAction {
    Execute,
    Defer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Executed,
    Deferred,
    Failed,
    Skipped,
}

/// Split a page into per-account groups, each in schedule id order
pub fn partition_by_account(
    items: Vec<RegularRemittance>,
) -> BTreeMap<AccountId, Vec<RegularRemittance>> {
    let mut groups: BTreeMap<AccountId, Vec<RegularRemittance>> = BTreeMap::new();
    for item in items {
        groups.entry(item.account).or_default().push(item);
    }
    groups
}

/// Batch executor for monthly and weekly standing instructions
pub struct RegularRemittanceScheduler {
    store: Arc<dyn LedgerStore>,
    remittances: Arc<RemittanceService>,
    calendar: BusinessCalendar,
    config: SchedulerConfig,
}

impl RegularRemittanceScheduler {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        remittances: Arc<RemittanceService>,
        config: SchedulerConfig,
    ) -> Self {
        let calendar = BusinessCalendar::new(config.holidays.iter().copied());
        RegularRemittanceScheduler {
            store,
            remittances,
            calendar,
            config,
        }
    }

    /// Run the job of `kind` for `today`
    pub async fn run(
        &self,
        ctx: &ExecutionContext,
        kind: ScheduleKind,
        today: NaiveDate,
    ) -> Result<RunReport, LedgerError> {
        match kind {
            ScheduleKind::Monthly => self.run_monthly(ctx, today).await,
            ScheduleKind::Weekly => self.run_weekly(ctx, today).await,
        }
    }

    /// Monthly job
    ///
    /// On a weekend or holiday every ACTIVE schedule due today is deferred to
    /// DELAYED and nothing is executed. On a business day every schedule due
    /// today (ACTIVE or DELAYED) is executed, together with every DELAYED
    /// monthly schedule left over from earlier days.
    pub async fn run_monthly(
        &self,
        ctx: &ExecutionContext,
        today: NaiveDate,
    ) -> Result<RunReport, LedgerError> {
        let days = monthly_candidate_days(today);
        let business_day = self.calendar.is_business_day(today);

        let (query, action) = if business_day {
            (
                DueQuery {
                    kind: ScheduleKind::Monthly,
                    day_keys: days,
                    statuses: vec![ScheduleStatus::Active, ScheduleStatus::Delayed],
                    include_delayed: true,
                },
                ItemAction::Execute,
            )
        } else {
            (
                DueQuery {
                    kind: ScheduleKind::Monthly,
                    day_keys: days,
                    statuses: vec![ScheduleStatus::Active],
                    include_delayed: false,
                },
                ItemAction::Defer,
            )
        };

        self.scan(ctx, RunReport::new(ScheduleKind::Monthly, today, business_day), query, action)
            .instrument(ctx.span("monthly_run"))
            .await
    }

    /// Weekly job: execute every ACTIVE or DELAYED schedule for today's weekday
    pub async fn run_weekly(
        &self,
        ctx: &ExecutionContext,
        today: NaiveDate,
    ) -> Result<RunReport, LedgerError> {
        let query = DueQuery {
            kind: ScheduleKind::Weekly,
            day_keys: vec![weekly_candidate_day(today)],
            statuses: vec![ScheduleStatus::Active, ScheduleStatus::Delayed],
            include_delayed: false,
        };
        let report = RunReport::new(
            ScheduleKind::Weekly,
            today,
            self.calendar.is_business_day(today),
        );

        self.scan(ctx, report, query, ItemAction::Execute)
            .instrument(ctx.span("weekly_run"))
            .await
    }

    async fn scan(
        &self,
        ctx: &ExecutionContext,
        mut report: RunReport,
        query: DueQuery,
        action: ItemAction,
    ) -> Result<RunReport, LedgerError> {
        let mut request = PageRequest::first(self.config.page_size);

        loop {
            let page = self
                .store
                .find_regular_remittances_due(&query, request)
                .await?;
            report.pages += 1;
            report.scanned += page.items.len();

            for outcome in self.process_page(ctx, page.items, report.date, action).await {
                report.record(outcome);
            }

            match page.next {
                Some(next) => request = next,
                None => break,
            }
        }

        tracing::info!(
            kind = %report.kind,
            date = %report.date,
            business_day = report.business_day,
            pages = report.pages,
            scanned = report.scanned,
            executed = report.executed,
            deferred = report.deferred,
            failed = report.failed,
            skipped = report.skipped,
            "scheduler run finished"
        );
        Ok(report)
    }

    async fn process_page(
        &self,
        ctx: &ExecutionContext,
        items: Vec<RegularRemittance>,
        today: NaiveDate,
        action: ItemAction,
    ) -> Vec<ItemOutcome> {
        let groups = partition_by_account(items);

        stream::iter(groups.into_values())
            .map(move |group| self.process_account(ctx, group, today, action))
            .buffer_unordered(self.config.max_concurrency)
            .collect::<Vec<Vec<ItemOutcome>>>()
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn process_account(
        &self,
        ctx: &ExecutionContext,
        items: Vec<RegularRemittance>,
        today: NaiveDate,
        action: ItemAction,
    ) -> Vec<ItemOutcome> {
        let mut outcomes = Vec::with_capacity(items.len());
        for item in &items {
            outcomes.push(self.process_item(ctx, item, today, action).await);
        }
        outcomes
    }

    async fn process_item(
        &self,
        ctx: &ExecutionContext,
        item: &RegularRemittance,
        today: NaiveDate,
        action: ItemAction,
    ) -> ItemOutcome {
        match action {
            ItemAction::Defer => {
                match self
                    .transition(item, &[ScheduleStatus::Active], ScheduleStatus::Delayed)
                    .await
                {
                    Ok(true) => {
                        tracing::info!(schedule = item.id, account = item.account, "deferred to next business day");
                        ItemOutcome::Deferred
                    }
                    Ok(false) => ItemOutcome::Skipped,
                    Err(error) if is_withdrawn(&error) => ItemOutcome::Skipped,
                    Err(_) => ItemOutcome::Failed,
                }
            }
            ItemAction::Execute => {
                let item_ctx = ctx.child();
                let command = RemittanceCommand::from_schedule(item, today);
                match self.remittances.remit(&item_ctx, command).await {
                    Ok(result) => {
                        if item.status == ScheduleStatus::Delayed {
                            let _ = self
                                .transition(item, &[ScheduleStatus::Delayed], ScheduleStatus::Active)
                                .await;
                        }
                        tracing::debug!(
                            schedule = item.id,
                            remittance = %result.remittance.id,
                            "scheduled remittance executed"
                        );
                        ItemOutcome::Executed
                    }
                    Err(error) if is_withdrawn(&error) => {
                        tracing::info!(schedule = item.id, error = %error, "scheduled remittance skipped");
                        ItemOutcome::Skipped
                    }
                    Err(error) => {
                        tracing::warn!(
                            schedule = item.id,
                            account = item.account,
                            correlation_id = %item_ctx.correlation_id(),
                            error = %error,
                            "scheduled remittance failed"
                        );
                        let _ = self
                            .transition(
                                item,
                                &[ScheduleStatus::Active, ScheduleStatus::Delayed],
                                ScheduleStatus::Delayed,
                            )
                            .await;
                        ItemOutcome::Failed
                    }
                }
            }
        }
    }

    /// Conditional status move; a refused move is logged and left alone
    async fn transition(
        &self,
        item: &RegularRemittance,
        from: &[ScheduleStatus],
        to: ScheduleStatus,
    ) -> Result<bool, LedgerError> {
        let moved = self
            .store
            .transition_schedule_status(item.id, from, to)
            .await
            .inspect_err(|error| {
                tracing::error!(schedule = item.id, status = %to, error = %error, "failed to update schedule status");
            })?;
        if !moved {
            tracing::info!(schedule = item.id, status = %to, "schedule changed by its owner, status left as is");
        }
        Ok(moved)
    }

    /// Run both jobs on their cron triggers until `ctx` is cancelled
    ///
    /// Cancellation is observed between runs; a job that has started runs to
    /// completion under its own context.
    ///
    /// # Errors
    ///
    /// `InvalidSchedule` if a cron expression does not parse.
    pub async fn run_triggers(&self, ctx: &ExecutionContext) -> Result<(), LedgerError> {
        let monthly = parse_cron(&self.config.monthly_cron)?;
        let weekly = parse_cron(&self.config.weekly_cron)?;

        tokio::join!(
            self.trigger_loop(ctx, ScheduleKind::Monthly, monthly),
            self.trigger_loop(ctx, ScheduleKind::Weekly, weekly),
        );
        Ok(())
    }

    async fn trigger_loop(&self, ctx: &ExecutionContext, kind: ScheduleKind, trigger: CronSchedule) {
        loop {
            let Some(next) = trigger.upcoming(Local).next() else {
                tracing::warn!(kind = %kind, "cron trigger has no upcoming time");
                return;
            };
            let delay = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!(kind = %kind, next = %next, "waiting for next run");

            tokio::select! {
                _ = ctx.cancelled() => {
                    tracing::info!(kind = %kind, "scheduler trigger stopped");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let run_ctx = ExecutionContext::new();
            if let Err(error) = self.run(&run_ctx, kind, next.date_naive()).await {
                tracing::error!(kind = %kind, error = %error, "scheduler run aborted");
            }
        }
    }
}

/// Whether `error` means the owner paused or deleted the schedule mid-run
fn is_withdrawn(error: &LedgerError) -> bool {
    matches!(
        error,
        LedgerError::ScheduleNotRunnable { .. }
            | LedgerError::NotFound {
                entity: "regular remittance",
                ..
            }
    )
}

/// Parse a six- or seven-field cron expression (seconds first)
pub fn parse_cron(expression: &str) -> Result<CronSchedule, LedgerError> {
    CronSchedule::from_str(expression)
        .map_err(|error| LedgerError::InvalidSchedule(format!("cron '{expression}': {error}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LockConfig;
    use crate::core::engine::TransactionEngine;
    use crate::core::lock_coordinator::AccountLockCoordinator;
    use crate::core::memory::{InMemoryLedger, InMemoryLockManager};
    use crate::core::rates::StaticRateProvider;
    use crate::core::remittance::RemittanceProcessor;
    use crate::core::traits::ExchangeRateProvider;
    use crate::types::{Account, Recipient, RemittanceFee, Schedule};
    use chrono::{Utc, Weekday};
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn schedule(id: u64, account: AccountId, schedule: Schedule) -> RegularRemittance {
        RegularRemittance {
            id,
            account,
            client: 1,
            recipient: 1,
            fee_policy: 1,
            from_currency: "KRW".to_string(),
            to_currency: "KRW".to_string(),
            amount: Decimal::new(1000, 0),
            schedule,
            status: ScheduleStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn scheduler(ledger: Arc<InMemoryLedger>, config: SchedulerConfig) -> RegularRemittanceScheduler {
        let rates = Arc::new(StaticRateProvider::default().with_rate("KRW", Decimal::ONE));
        scheduler_with_rates(ledger, config, rates)
    }

    fn scheduler_with_rates(
        ledger: Arc<InMemoryLedger>,
        config: SchedulerConfig,
        rates: Arc<dyn ExchangeRateProvider>,
    ) -> RegularRemittanceScheduler {
        ledger.insert_recipient(Recipient {
            id: 1,
            name: "Jane Doe".to_string(),
            bank_code: "CHASUS33".to_string(),
            account_number: "000123".to_string(),
            country: "US".to_string(),
            currency: "KRW".to_string(),
        });
        ledger.insert_fee_policy(RemittanceFee {
            id: 1,
            flat_fee: Decimal::new(100, 0),
            rate: Decimal::ZERO,
            network_fee: Decimal::ZERO,
        });
        let engine = Arc::new(TransactionEngine::standard(ledger.clone()));
        let processor = Arc::new(RemittanceProcessor::new(ledger.clone(), engine, rates));
        let locks = Arc::new(AccountLockCoordinator::new(
            Arc::new(InMemoryLockManager::new(Duration::from_millis(1))),
            LockConfig::default(),
        ));
        let remittances = Arc::new(RemittanceService::new(ledger.clone(), locks, processor));
        RegularRemittanceScheduler::new(ledger, remittances, config)
    }

    /// Rate feed that pauses a schedule on its owner's behalf when queried
    struct PausingRates {
        ledger: Arc<InMemoryLedger>,
        schedule: u64,
        available: bool,
    }

    #[async_trait::async_trait]
    impl ExchangeRateProvider for PausingRates {
        async fn rates(&self) -> Result<HashMap<String, Decimal>, LedgerError> {
            self.ledger
                .transition_schedule_status(
                    self.schedule,
                    &[ScheduleStatus::Active, ScheduleStatus::Delayed],
                    ScheduleStatus::Paused,
                )
                .await?;
            if !self.available {
                return Err(LedgerError::storage("rate feed down"));
            }
            Ok(HashMap::from([("KRW".to_string(), Decimal::ONE)]))
        }
    }

    async fn status(ledger: &InMemoryLedger, id: u64) -> ScheduleStatus {
        ledger
            .find_regular_remittance(id)
            .await
            .unwrap()
            .unwrap()
            .status
    }

    #[test]
    fn test_partition_by_account_keeps_id_order() {
        let items = vec![
            schedule(1, 10, Schedule::monthly(1).unwrap()),
            schedule(2, 20, Schedule::monthly(1).unwrap()),
            schedule(3, 10, Schedule::monthly(1).unwrap()),
        ];

        let groups = partition_by_account(items);

        assert_eq!(groups.len(), 2);
        let ids: Vec<u64> = groups[&10].iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_weekend_defers_and_monday_executes() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.insert_account(Account::new(1, 1, Decimal::new(10_000, 0), "KRW"));
        ledger
            .insert_schedule(schedule(1, 1, Schedule::monthly(7).unwrap()))
            .unwrap();
        let scheduler = scheduler(ledger.clone(), SchedulerConfig::default());
        let ctx = ExecutionContext::new();

        // 2026-03-07 is a Saturday
        let saturday = scheduler.run_monthly(&ctx, date(2026, 3, 7)).await.unwrap();
        assert!(!saturday.business_day);
        assert_eq!(saturday.deferred, 1);
        assert_eq!(saturday.executed, 0);
        assert_eq!(status(&ledger, 1).await, ScheduleStatus::Delayed);
        assert_eq!(ledger.transaction_count(), 0);

        let sunday = scheduler.run_monthly(&ctx, date(2026, 3, 8)).await.unwrap();
        assert_eq!(sunday.scanned, 0);

        let monday = scheduler.run_monthly(&ctx, date(2026, 3, 9)).await.unwrap();
        assert_eq!(monday.executed, 1);
        assert_eq!(status(&ledger, 1).await, ScheduleStatus::Active);
        assert_eq!(ledger.account(1).unwrap().balance, Decimal::new(8_900, 0));

        let executions = ledger.remittances_for_schedule(1).await.unwrap();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].effective_date, date(2026, 3, 9));
    }

    #[tokio::test]
    async fn test_holiday_is_treated_like_weekend() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.insert_account(Account::new(1, 1, Decimal::new(10_000, 0), "KRW"));
        ledger
            .insert_schedule(schedule(1, 1, Schedule::monthly(2).unwrap()))
            .unwrap();
        let config = SchedulerConfig::default().with_holidays([date(2026, 3, 2)]);
        let scheduler = scheduler(ledger.clone(), config);

        let report = scheduler
            .run_monthly(&ExecutionContext::new(), date(2026, 3, 2))
            .await
            .unwrap();

        assert_eq!(report.deferred, 1);
        assert_eq!(status(&ledger, 1).await, ScheduleStatus::Delayed);
    }

    #[tokio::test]
    async fn test_month_end_runs_later_days() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.insert_account(Account::new(1, 1, Decimal::new(10_000, 0), "KRW"));
        ledger
            .insert_schedule(schedule(1, 1, Schedule::monthly(31).unwrap()))
            .unwrap();
        ledger
            .insert_schedule(schedule(2, 1, Schedule::monthly(30).unwrap()))
            .unwrap();
        ledger
            .insert_schedule(schedule(3, 1, Schedule::monthly(29).unwrap()))
            .unwrap();
        let scheduler = scheduler(ledger.clone(), SchedulerConfig::default());

        // 2026-04-30 is a Thursday
        let report = scheduler
            .run_monthly(&ExecutionContext::new(), date(2026, 4, 30))
            .await
            .unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.executed, 2);
        assert!(ledger.remittances_for_schedule(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_marks_delayed_and_continues() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.insert_account(Account::new(1, 1, Decimal::new(500, 0), "KRW"));
        ledger.insert_account(Account::new(2, 1, Decimal::new(10_000, 0), "KRW"));
        ledger
            .insert_schedule(schedule(1, 1, Schedule::monthly(9).unwrap()))
            .unwrap();
        ledger
            .insert_schedule(schedule(2, 2, Schedule::monthly(9).unwrap()))
            .unwrap();
        let scheduler = scheduler(ledger.clone(), SchedulerConfig::default());

        let report = scheduler
            .run_monthly(&ExecutionContext::new(), date(2026, 3, 9))
            .await
            .unwrap();

        assert_eq!(report.executed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(status(&ledger, 1).await, ScheduleStatus::Delayed);
        assert_eq!(status(&ledger, 2).await, ScheduleStatus::Active);
        assert_eq!(ledger.account(1).unwrap().balance, Decimal::new(500, 0));
    }

    #[tokio::test]
    async fn test_paused_schedules_are_never_touched() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.insert_account(Account::new(1, 1, Decimal::new(10_000, 0), "KRW"));
        let mut paused = schedule(1, 1, Schedule::monthly(7).unwrap());
        paused.status = ScheduleStatus::Paused;
        ledger.insert_schedule(paused).unwrap();
        let scheduler = scheduler(ledger.clone(), SchedulerConfig::default());
        let ctx = ExecutionContext::new();

        scheduler.run_monthly(&ctx, date(2026, 3, 7)).await.unwrap();
        scheduler.run_monthly(&ctx, date(2026, 3, 9)).await.unwrap();

        assert_eq!(status(&ledger, 1).await, ScheduleStatus::Paused);
        assert_eq!(ledger.transaction_count(), 0);
    }

    #[rstest::rstest]
    #[case::active(ScheduleStatus::Active)]
    #[case::delayed(ScheduleStatus::Delayed)]
    #[tokio::test]
    async fn test_failure_keeps_pause_made_during_run(#[case] initial: ScheduleStatus) {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.insert_account(Account::new(1, 1, Decimal::new(10_000, 0), "KRW"));
        let mut item = schedule(1, 1, Schedule::monthly(9).unwrap());
        item.status = initial;
        ledger.insert_schedule(item).unwrap();
        let rates = Arc::new(PausingRates {
            ledger: ledger.clone(),
            schedule: 1,
            available: false,
        });
        let scheduler = scheduler_with_rates(ledger.clone(), SchedulerConfig::default(), rates);

        let report = scheduler
            .run_monthly(&ExecutionContext::new(), date(2026, 3, 9))
            .await
            .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(status(&ledger, 1).await, ScheduleStatus::Paused);
        assert_eq!(ledger.account(1).unwrap().balance, Decimal::new(10_000, 0));
    }

    #[tokio::test]
    async fn test_schedule_paused_before_its_turn_is_skipped() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.insert_account(Account::new(1, 1, Decimal::new(10_000, 0), "KRW"));
        let mut first = schedule(1, 1, Schedule::monthly(9).unwrap());
        first.status = ScheduleStatus::Delayed;
        ledger.insert_schedule(first).unwrap();
        ledger
            .insert_schedule(schedule(2, 1, Schedule::monthly(9).unwrap()))
            .unwrap();
        // Executing schedule 1 pauses schedule 2, which comes next for the account
        let rates = Arc::new(PausingRates {
            ledger: ledger.clone(),
            schedule: 2,
            available: true,
        });
        let scheduler = scheduler_with_rates(ledger.clone(), SchedulerConfig::default(), rates);

        let report = scheduler
            .run_monthly(&ExecutionContext::new(), date(2026, 3, 9))
            .await
            .unwrap();

        assert_eq!(report.executed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(status(&ledger, 1).await, ScheduleStatus::Active);
        assert_eq!(status(&ledger, 2).await, ScheduleStatus::Paused);
        assert!(ledger.remittances_for_schedule(2).await.unwrap().is_empty());
        assert_eq!(ledger.account(1).unwrap().balance, Decimal::new(8_900, 0));
    }

    #[tokio::test]
    async fn test_weekly_runs_on_weekday_match() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.insert_account(Account::new(1, 1, Decimal::new(10_000, 0), "KRW"));
        ledger
            .insert_schedule(schedule(1, 1, Schedule::weekly(Weekday::Sat)))
            .unwrap();
        ledger
            .insert_schedule(schedule(2, 1, Schedule::weekly(Weekday::Mon)))
            .unwrap();
        let scheduler = scheduler(ledger.clone(), SchedulerConfig::default());

        let report = scheduler
            .run_weekly(&ExecutionContext::new(), date(2026, 3, 7))
            .await
            .unwrap();

        assert_eq!(report.executed, 1);
        assert_eq!(ledger.remittances_for_schedule(1).await.unwrap().len(), 1);
        assert!(ledger.remittances_for_schedule(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_many_pages_are_all_visited() {
        let ledger = Arc::new(InMemoryLedger::new());
        for id in 1..=25u64 {
            ledger.insert_account(Account::new(id, 1, Decimal::new(10_000, 0), "KRW"));
            ledger
                .insert_schedule(schedule(id, id, Schedule::monthly(7).unwrap()))
                .unwrap();
        }
        let scheduler = scheduler(ledger.clone(), SchedulerConfig::new(10, 4));

        let report = scheduler
            .run_monthly(&ExecutionContext::new(), date(2026, 3, 7))
            .await
            .unwrap();

        assert_eq!(report.pages, 3);
        assert_eq!(report.deferred, 25);
    }

    #[test]
    fn test_invalid_cron_is_rejected() {
        assert!(parse_cron("0 0 9 * * *").is_ok());
        assert!(matches!(
            parse_cron("every day"),
            Err(LedgerError::InvalidSchedule(_))
        ));
    }

    #[tokio::test]
    async fn test_triggers_stop_on_cancellation() {
        let ledger = Arc::new(InMemoryLedger::new());
        let scheduler = scheduler(ledger, SchedulerConfig::default());
        let ctx = ExecutionContext::new();
        ctx.cancel();

        scheduler.run_triggers(&ctx).await.unwrap();
    }
}
