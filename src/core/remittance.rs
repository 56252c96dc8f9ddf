//! Overseas remittance execution
//!
//! [`RemittanceProcessor`] performs one remittance inside one unit of work:
//!
//! 1. Resolve the account and fee policy
//! 2. Compute the fee and the total deduction (`send_amount + total_fee`)
//! 3. Reject with `InsufficientFunds` before touching anything if the balance
//!    does not cover the total deduction
//! 4. Resolve the recipient, creating it from bank details if it is new
//! 5. Create the remittance in `Requested`, debit the fee, then the principal
//! 6. Advance the remittance to `Pending`, save the account and commit
//!
//! Any error before the commit drops the unit, so nothing of the remittance is
//! persisted. FAILURE transaction entries are the exception; the engine writes
//! them outside the unit. A recipient created in step 4 also stays when a
//! later debit or the commit fails.
//!
//! [`RemittanceService`] runs the processor under the account lock and is the
//! entry point for both one-shot requests and the scheduler. Commands issued
//! for a standing instruction are re-checked under that lock, so a pause or
//! delete that wins the lock stops the execution.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::engine::TransactionEngine;
use crate::core::lock_coordinator::AccountLockCoordinator;
use crate::core::rates::conversion_rate;
use crate::core::traits::{ExchangeRateProvider, LedgerStore, UnitOfWork};
use crate::strategy::ensure_positive;
use crate::types::{
    AccountId, ClientId, ExecutionContext, FeePolicyId, FeeRecord, LedgerError,
    OverseasRemittance, Recipient, RecipientId, RecipientIdentity, RecipientQuery,
    RegularRemittance, RemittanceStatus, ScheduleId, ScheduleStatus, Transaction, TransactionType,
    MONEY_SCALE,
};

/// Recipient of a remittance command
#[derive(Debug, Clone, PartialEq)]
pub enum RecipientRef {
    /// Registered recipient
    Id(RecipientId),

    /// Recipient given by bank details; created on first use
    Identity {
        identity: RecipientIdentity,
        country: String,
    },
}

/// Everything needed to execute one remittance
#[derive(Debug, Clone, PartialEq)]
pub struct RemittanceCommand {
    pub account: AccountId,
    pub recipient: RecipientRef,
    pub fee_policy: FeePolicyId,

    /// Standing instruction that produced this command, if any
    pub schedule: Option<ScheduleId>,

    pub from_currency: String,
    pub to_currency: String,
    pub send_amount: Decimal,
    pub effective_date: NaiveDate,
}

impl RemittanceCommand {
    /// Command for one execution of a standing instruction
    pub fn from_schedule(schedule: &RegularRemittance, effective_date: NaiveDate) -> Self {
        RemittanceCommand {
            account: schedule.account,
            recipient: RecipientRef::Id(schedule.recipient),
            fee_policy: schedule.fee_policy,
            schedule: Some(schedule.id),
            from_currency: schedule.from_currency.clone(),
            to_currency: schedule.to_currency.clone(),
            send_amount: schedule.amount,
            effective_date,
        }
    }
}

/// One-shot remittance request from a client
#[derive(Debug, Clone, PartialEq)]
pub struct RemittanceRequest {
    pub client: ClientId,
    pub account: AccountId,
    pub recipient: RecipientIdentity,
    pub recipient_country: String,
    pub fee_policy: FeePolicyId,
    pub from_currency: String,
    pub to_currency: String,
    pub send_amount: Decimal,
}

/// Outcome of a committed remittance
#[derive(Debug, Clone, PartialEq)]
pub struct RemittanceResult {
    pub remittance: OverseasRemittance,
    pub fee: FeeRecord,
    pub fee_transaction: Transaction,
    pub principal_transaction: Transaction,
    pub balance_after: Decimal,
}

/// Executes remittances in a unit of work
pub struct RemittanceProcessor {
    store: Arc<dyn LedgerStore>,
    engine: Arc<TransactionEngine>,
    rates: Arc<dyn ExchangeRateProvider>,
}

impl RemittanceProcessor {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        engine: Arc<TransactionEngine>,
        rates: Arc<dyn ExchangeRateProvider>,
    ) -> Self {
        RemittanceProcessor {
            store,
            engine,
            rates,
        }
    }

    /// Execute `command` atomically
    ///
    /// The caller is expected to hold the account lock (see
    /// [`RemittanceService::remit`]).
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` for a non-positive send amount
    /// - `NotFound` for a missing account, recipient, fee policy or rate
    /// - `AccountUnavailable` if the account is not active
    /// - `InsufficientFunds` if the balance does not cover amount plus fee;
    ///   nothing is written
    /// - `TransactionFailed` if a debit fails; only its FAILURE entry is written
    /// - `ConcurrentModification` if the account changed before commit
    pub async fn execute(
        &self,
        ctx: &ExecutionContext,
        command: &RemittanceCommand,
    ) -> Result<RemittanceResult, LedgerError> {
        ensure_positive(command.send_amount)?;

        let mut unit = self.store.begin().await?;
        let result = self.execute_in_unit(ctx, unit.as_mut(), command).await;
        match result {
            Ok(result) => {
                unit.commit().await?;
                tracing::info!(
                    account = command.account,
                    remittance = %result.remittance.id,
                    schedule = ?command.schedule,
                    total_deduction = %result.remittance.total_deduction,
                    "remittance committed"
                );
                Ok(result)
            }
            Err(error) => {
                if let Err(rollback_error) = unit.rollback().await {
                    tracing::warn!(error = %rollback_error, "remittance rollback failed");
                }
                Err(error)
            }
        }
    }

    async fn execute_in_unit(
        &self,
        ctx: &ExecutionContext,
        unit: &mut dyn UnitOfWork,
        command: &RemittanceCommand,
    ) -> Result<RemittanceResult, LedgerError> {
        let mut account = unit
            .find_account(command.account)
            .await?
            .ok_or_else(|| LedgerError::account_not_found(command.account))?;
        if !account.is_active() {
            return Err(LedgerError::account_unavailable(account.id, account.state));
        }
        let policy = unit
            .find_fee_policy(command.fee_policy)
            .await?
            .ok_or_else(|| LedgerError::not_found("fee policy", command.fee_policy))?;

        let rates = self.rates.rates().await?;
        let exchange_rate = conversion_rate(&rates, &command.from_currency, &command.to_currency)?;

        let fee = FeeRecord::compute(&policy, command.send_amount);
        let total_deduction = command.send_amount + fee.total_fee;
        if account.balance < total_deduction {
            return Err(LedgerError::insufficient_funds(
                account.id,
                account.balance,
                total_deduction,
            ));
        }
        let recipient = self.resolve_recipient(unit, command).await?;

        let mut remittance = OverseasRemittance {
            id: Uuid::new_v4(),
            account: account.id,
            recipient: recipient.id,
            fee_record: fee.id,
            schedule: command.schedule,
            from_currency: command.from_currency.clone(),
            to_currency: command.to_currency.clone(),
            exchange_rate,
            send_amount: command.send_amount,
            receive_amount: (command.send_amount * exchange_rate).round_dp(MONEY_SCALE),
            total_fee: fee.total_fee,
            total_deduction,
            status: RemittanceStatus::Requested,
            effective_date: command.effective_date,
            created_at: Utc::now(),
        };
        unit.save_fee_record(&fee).await?;
        unit.save_remittance(&remittance).await?;

        let reference = remittance.id.to_string();
        let fee_transaction = self
            .engine
            .execute(
                ctx,
                unit,
                TransactionType::Fee,
                &mut account,
                fee.total_fee,
                Some(&reference),
            )
            .await?;
        let principal_transaction = self
            .engine
            .execute(
                ctx,
                unit,
                TransactionType::Withdrawal,
                &mut account,
                command.send_amount,
                Some(&reference),
            )
            .await?;

        remittance.advance(RemittanceStatus::Pending)?;
        unit.save_remittance(&remittance).await?;
        unit.save_account(&account).await?;

        Ok(RemittanceResult {
            remittance,
            fee,
            fee_transaction,
            principal_transaction,
            balance_after: account.balance,
        })
    }

    async fn resolve_recipient(
        &self,
        unit: &mut dyn UnitOfWork,
        command: &RemittanceCommand,
    ) -> Result<Recipient, LedgerError> {
        match &command.recipient {
            RecipientRef::Id(id) => unit
                .find_recipient(&RecipientQuery::ById(*id))
                .await?
                .ok_or_else(|| LedgerError::not_found("recipient", id)),
            RecipientRef::Identity { identity, country } => {
                self.store
                    .find_or_create_recipient(identity.clone(), country, &command.to_currency)
                    .await
            }
        }
    }
}

/// Lock-coordinated remittance entry point
pub struct RemittanceService {
    store: Arc<dyn LedgerStore>,
    locks: Arc<AccountLockCoordinator>,
    processor: Arc<RemittanceProcessor>,
}

impl RemittanceService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        locks: Arc<AccountLockCoordinator>,
        processor: Arc<RemittanceProcessor>,
    ) -> Self {
        RemittanceService {
            store,
            locks,
            processor,
        }
    }

    /// Execute `command` under the lock of its account
    pub async fn remit(
        &self,
        ctx: &ExecutionContext,
        command: RemittanceCommand,
    ) -> Result<RemittanceResult, LedgerError> {
        let command = &command;
        self.locks
            .execute_with_lock(ctx, command.account, move || async move {
                if let Some(schedule) = command.schedule {
                    self.ensure_runnable(schedule).await?;
                }
                self.processor.execute(ctx, command).await
            })
            .instrument(ctx.span("remit"))
            .await
    }

    /// Fail unless the standing instruction still exists and is not paused
    async fn ensure_runnable(&self, id: ScheduleId) -> Result<(), LedgerError> {
        let schedule = self
            .store
            .find_regular_remittance(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("regular remittance", id))?;
        match schedule.status {
            ScheduleStatus::Paused => Err(LedgerError::schedule_not_runnable(id, schedule.status)),
            ScheduleStatus::Active | ScheduleStatus::Delayed => Ok(()),
        }
    }

    /// One-shot remittance requested by a client
    ///
    /// The recipient is looked up by bank code, account number and name and
    /// created on first use, once the balance check has passed. A request
    /// rejected by a precondition creates nothing.
    ///
    /// # Errors
    ///
    /// `Forbidden` if `request.client` does not own the account, plus every
    /// error of [`RemittanceService::remit`].
    pub async fn request(
        &self,
        ctx: &ExecutionContext,
        request: RemittanceRequest,
    ) -> Result<RemittanceResult, LedgerError> {
        let account = self
            .store
            .find_account(request.account)
            .await?
            .ok_or_else(|| LedgerError::account_not_found(request.account))?;
        if account.client != request.client {
            return Err(LedgerError::forbidden(
                request.client,
                format!("account {}", account.id),
            ));
        }

        let command = RemittanceCommand {
            account: request.account,
            recipient: RecipientRef::Identity {
                identity: request.recipient,
                country: request.recipient_country,
            },
            fee_policy: request.fee_policy,
            schedule: None,
            from_currency: request.from_currency,
            to_currency: request.to_currency,
            send_amount: request.send_amount,
            effective_date: Utc::now().date_naive(),
        };
        self.remit(ctx, command).await
    }
}
