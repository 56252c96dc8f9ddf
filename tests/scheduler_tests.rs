//! Standing instruction flows through the public service API
//!
//! Instructions are registered with `RegularRemittanceService` and executed
//! by `RegularRemittanceScheduler` on fixed dates in March and April 2026
//! (March 7 is a Saturday).

use chrono::{NaiveDate, Weekday};
use rust_decimal::Decimal;
use std::sync::Arc;

use remittance_ledger::app::LedgerServices;
use remittance_ledger::config::Config;
use remittance_ledger::core::{
    InMemoryLedger, InMemoryLockManager, LedgerStore, RegistrationRequest, StaticRateProvider,
};
use remittance_ledger::core::remittance::RemittanceRequest;
use remittance_ledger::types::{
    Account, ErrorKind, ExecutionContext, RecipientIdentity, RemittanceFee, RemittanceStatus,
    Schedule, ScheduleKind, ScheduleStatus,
};

const CLIENT: u64 = 7;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn setup_with(balance: i64, config: Config) -> (Arc<InMemoryLedger>, LedgerServices) {
    let ledger = Arc::new(InMemoryLedger::new());
    ledger.insert_account(Account::new(1, CLIENT, Decimal::new(balance, 0), "KRW"));
    ledger.insert_fee_policy(RemittanceFee {
        id: 1,
        flat_fee: Decimal::new(1000, 0),
        rate: Decimal::ZERO,
        network_fee: Decimal::ZERO,
    });
    let rates = StaticRateProvider::default()
        .with_rate("KRW", Decimal::ONE)
        .with_rate("USD", Decimal::new(1250, 0));

    let services = LedgerServices::build(
        &config,
        ledger.clone(),
        Arc::new(InMemoryLockManager::default()),
        Arc::new(rates),
    );
    (ledger, services)
}

fn setup(balance: i64) -> (Arc<InMemoryLedger>, LedgerServices) {
    setup_with(balance, Config::default())
}

fn registration(schedule: Schedule) -> RegistrationRequest {
    RegistrationRequest {
        account: 1,
        recipient: RecipientIdentity {
            bank_code: "CHASUS33".to_string(),
            account_number: "000123".to_string(),
            name: "Jane Doe".to_string(),
        },
        recipient_country: "US".to_string(),
        fee_policy: 1,
        from_currency: "KRW".to_string(),
        to_currency: "USD".to_string(),
        amount: Decimal::new(10_000, 0),
        schedule,
    }
}

#[tokio::test]
async fn test_weekend_deferral_is_caught_up_on_monday() {
    let (ledger, services) = setup(100_000);
    let ctx = ExecutionContext::new();
    let schedule = services
        .regular_remittances
        .register(&ctx, CLIENT, registration(Schedule::monthly(7).unwrap()))
        .await
        .unwrap();

    let saturday = services
        .scheduler
        .run(&ctx, ScheduleKind::Monthly, date(2026, 3, 7))
        .await
        .unwrap();
    assert!(!saturday.business_day);
    assert_eq!(saturday.deferred, 1);
    assert_eq!(saturday.executed, 0);
    assert_eq!(ledger.account(1).unwrap().balance, Decimal::new(100_000, 0));
    let stored = ledger.find_regular_remittance(schedule.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ScheduleStatus::Delayed);

    let monday = services
        .scheduler
        .run(&ctx, ScheduleKind::Monthly, date(2026, 3, 9))
        .await
        .unwrap();
    assert_eq!(monday.executed, 1);
    assert_eq!(ledger.account(1).unwrap().balance, Decimal::new(89_000, 0));
    let stored = ledger.find_regular_remittance(schedule.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ScheduleStatus::Active);

    let executions = services
        .regular_remittances
        .executions(CLIENT, schedule.id)
        .await
        .unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].effective_date, date(2026, 3, 9));
    assert_eq!(executions[0].receive_amount, Decimal::new(8, 0));
    assert_eq!(executions[0].status, RemittanceStatus::Pending);
}

#[tokio::test]
async fn test_configured_holiday_defers_like_a_weekend() {
    let config = Config {
        holidays: vec![date(2026, 3, 10)],
        ..Config::default()
    };
    let (ledger, services) = setup_with(100_000, config);
    let ctx = ExecutionContext::new();
    services
        .regular_remittances
        .register(&ctx, CLIENT, registration(Schedule::monthly(10).unwrap()))
        .await
        .unwrap();

    let holiday = services
        .scheduler
        .run(&ctx, ScheduleKind::Monthly, date(2026, 3, 10))
        .await
        .unwrap();
    assert_eq!(holiday.deferred, 1);

    let next_day = services
        .scheduler
        .run(&ctx, ScheduleKind::Monthly, date(2026, 3, 11))
        .await
        .unwrap();
    assert_eq!(next_day.executed, 1);
    assert_eq!(ledger.account(1).unwrap().balance, Decimal::new(89_000, 0));
}

#[tokio::test]
async fn test_month_end_runs_days_missing_from_the_month() {
    let (ledger, services) = setup(100_000);
    let ctx = ExecutionContext::new();
    for day in [29, 30, 31] {
        let mut request = registration(Schedule::monthly(day).unwrap());
        request.recipient.account_number = format!("acct-{day}");
        services
            .regular_remittances
            .register(&ctx, CLIENT, request)
            .await
            .unwrap();
    }

    let report = services
        .scheduler
        .run(&ctx, ScheduleKind::Monthly, date(2026, 4, 30))
        .await
        .unwrap();

    // The 29th already passed in April
    assert_eq!(report.executed, 2);
    assert_eq!(ledger.account(1).unwrap().balance, Decimal::new(78_000, 0));
}

#[tokio::test]
async fn test_weekly_instruction_runs_on_its_weekday() {
    let (ledger, services) = setup(100_000);
    let ctx = ExecutionContext::new();
    services
        .regular_remittances
        .register(&ctx, CLIENT, registration(Schedule::weekly(Weekday::Fri)))
        .await
        .unwrap();

    let thursday = services
        .scheduler
        .run(&ctx, ScheduleKind::Weekly, date(2026, 3, 12))
        .await
        .unwrap();
    let friday = services
        .scheduler
        .run(&ctx, ScheduleKind::Weekly, date(2026, 3, 13))
        .await
        .unwrap();

    assert_eq!(thursday.scanned, 0);
    assert_eq!(friday.executed, 1);
    assert_eq!(ledger.account(1).unwrap().balance, Decimal::new(89_000, 0));
}

#[tokio::test]
async fn test_amount_change_after_deferral_still_runs_on_monday() {
    let (ledger, services) = setup(100_000);
    let ctx = ExecutionContext::new();
    let schedule = services
        .regular_remittances
        .register(&ctx, CLIENT, registration(Schedule::monthly(9).unwrap()))
        .await
        .unwrap();

    // 2026-05-09 is a Saturday
    let saturday = services
        .scheduler
        .run(&ctx, ScheduleKind::Monthly, date(2026, 5, 9))
        .await
        .unwrap();
    assert_eq!(saturday.deferred, 1);

    let updated = services
        .regular_remittances
        .update_amount(&ctx, CLIENT, schedule.id, Decimal::new(20_000, 0))
        .await
        .unwrap();
    assert_eq!(updated.status, ScheduleStatus::Delayed);

    let monday = services
        .scheduler
        .run(&ctx, ScheduleKind::Monthly, date(2026, 5, 11))
        .await
        .unwrap();
    assert_eq!(monday.executed, 1);
    assert_eq!(ledger.account(1).unwrap().balance, Decimal::new(79_000, 0));
    let stored = ledger.find_regular_remittance(schedule.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ScheduleStatus::Active);
}

#[tokio::test]
async fn test_paused_instruction_is_skipped_until_resumed() {
    let (ledger, services) = setup(100_000);
    let ctx = ExecutionContext::new();
    let schedule = services
        .regular_remittances
        .register(&ctx, CLIENT, registration(Schedule::monthly(9).unwrap()))
        .await
        .unwrap();
    services
        .regular_remittances
        .pause(&ctx, CLIENT, schedule.id)
        .await
        .unwrap();

    let paused = services
        .scheduler
        .run(&ctx, ScheduleKind::Monthly, date(2026, 3, 9))
        .await
        .unwrap();
    assert_eq!(paused.scanned, 0);
    assert_eq!(ledger.account(1).unwrap().balance, Decimal::new(100_000, 0));

    services
        .regular_remittances
        .resume(&ctx, CLIENT, schedule.id)
        .await
        .unwrap();
    let resumed = services
        .scheduler
        .run(&ctx, ScheduleKind::Monthly, date(2026, 4, 9))
        .await
        .unwrap();
    assert_eq!(resumed.executed, 1);
}

#[tokio::test]
async fn test_unaffordable_instruction_is_delayed_without_side_effects() {
    let (ledger, services) = setup(5_000);
    let ctx = ExecutionContext::new();
    let schedule = services
        .regular_remittances
        .register(&ctx, CLIENT, registration(Schedule::monthly(9).unwrap()))
        .await
        .unwrap();

    let report = services
        .scheduler
        .run(&ctx, ScheduleKind::Monthly, date(2026, 3, 9))
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(ledger.account(1).unwrap().balance, Decimal::new(5_000, 0));
    assert_eq!(ledger.transaction_count(), 0);
    assert!(ledger.remittances().is_empty());
    let stored = ledger.find_regular_remittance(schedule.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ScheduleStatus::Delayed);

    // Topped up, the next business day picks it up
    services
        .accounts
        .deposit(&ctx, 1, Decimal::new(10_000, 0))
        .await
        .unwrap();
    let retry = services
        .scheduler
        .run(&ctx, ScheduleKind::Monthly, date(2026, 3, 10))
        .await
        .unwrap();
    assert_eq!(retry.executed, 1);
    assert_eq!(ledger.account(1).unwrap().balance, Decimal::new(4_000, 0));
}

#[tokio::test]
async fn test_one_shot_request_shares_recipient_with_instruction() {
    let (ledger, services) = setup(100_000);
    let ctx = ExecutionContext::new();
    let schedule = services
        .regular_remittances
        .register(&ctx, CLIENT, registration(Schedule::monthly(9).unwrap()))
        .await
        .unwrap();

    let result = services
        .remittances
        .request(
            &ctx,
            RemittanceRequest {
                client: CLIENT,
                account: 1,
                recipient: registration(Schedule::monthly(9).unwrap()).recipient,
                recipient_country: "US".to_string(),
                fee_policy: 1,
                from_currency: "KRW".to_string(),
                to_currency: "USD".to_string(),
                send_amount: Decimal::new(25_000, 0),
            },
        )
        .await
        .unwrap();

    assert_eq!(result.remittance.recipient, schedule.recipient);
    assert_eq!(result.remittance.schedule, None);
    assert_eq!(result.balance_after, Decimal::new(74_000, 0));
    assert_eq!(ledger.fee_records().len(), 1);

    let err = services
        .remittances
        .request(
            &ctx,
            RemittanceRequest {
                client: CLIENT + 1,
                account: 1,
                recipient: registration(Schedule::monthly(9).unwrap()).recipient,
                recipient_country: "US".to_string(),
                fee_policy: 1,
                from_currency: "KRW".to_string(),
                to_currency: "USD".to_string(),
                send_amount: Decimal::new(25_000, 0),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}
