//! Management of standing remittance instructions
//!
//! Every change is made on behalf of a client and checked against the
//! schedule's owner, and runs under the account lock. Registration and
//! schedule moves hold it across the duplicate check. Status changes go through
//! the store's conditional transitions, and edits never write the status, so
//! an owner's change and a scheduler run cannot undo each other.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::Instrument;

use crate::core::lock_coordinator::AccountLockCoordinator;
use crate::core::traits::LedgerStore;
use crate::strategy::ensure_positive;
use crate::types::{
    AccountId, ClientId, ExecutionContext, FeePolicyId, LedgerError, NewRegularRemittance,
    OverseasRemittance, RecipientIdentity, RegularRemittance, Schedule, ScheduleId,
    ScheduleStatus, ScheduleUpdate,
};

/// Registration request for a standing instruction
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationRequest {
    pub account: AccountId,
    pub recipient: RecipientIdentity,
    pub recipient_country: String,
    pub fee_policy: FeePolicyId,
    pub from_currency: String,
    pub to_currency: String,
    pub amount: Decimal,
    pub schedule: Schedule,
}

pub struct RegularRemittanceService {
    store: Arc<dyn LedgerStore>,
    locks: Arc<AccountLockCoordinator>,
}

impl RegularRemittanceService {
    pub fn new(store: Arc<dyn LedgerStore>, locks: Arc<AccountLockCoordinator>) -> Self {
        RegularRemittanceService { store, locks }
    }

    /// Register a new standing instruction in ACTIVE
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown account or fee policy
    /// - `Forbidden` if `client` does not own the account
    /// - `InvalidAmount` for a non-positive amount
    /// - `DuplicateSchedule` if the same account, recipient and schedule are
    ///   already registered
    pub async fn register(
        &self,
        ctx: &ExecutionContext,
        client: ClientId,
        request: RegistrationRequest,
    ) -> Result<RegularRemittance, LedgerError> {
        ensure_positive(request.amount)?;
        let account = request.account;

        self.locks
            .execute_with_lock(ctx, account, move || self.register_locked(client, request))
            .instrument(ctx.span("register_regular_remittance"))
            .await
    }

    async fn register_locked(
        &self,
        client: ClientId,
        request: RegistrationRequest,
    ) -> Result<RegularRemittance, LedgerError> {
        let account = self
            .store
            .find_account(request.account)
            .await?
            .ok_or_else(|| LedgerError::account_not_found(request.account))?;
        if account.client != client {
            return Err(LedgerError::forbidden(client, format!("account {}", account.id)));
        }
        self.store
            .find_fee_policy(request.fee_policy)
            .await?
            .ok_or_else(|| LedgerError::not_found("fee policy", request.fee_policy))?;

        let recipient = self
            .store
            .find_or_create_recipient(
                request.recipient,
                &request.recipient_country,
                &request.to_currency,
            )
            .await?;

        let new = NewRegularRemittance {
            account: account.id,
            client,
            recipient: recipient.id,
            fee_policy: request.fee_policy,
            from_currency: request.from_currency,
            to_currency: request.to_currency,
            amount: request.amount,
            schedule: request.schedule,
        };
        let existing = self
            .store
            .find_regular_remittances_by_account(account.id)
            .await?;
        if existing.iter().any(|schedule| schedule.conflicts_with(&new)) {
            return Err(LedgerError::duplicate_schedule(account.id, recipient.id));
        }

        let created = self.store.insert_regular_remittance(new).await?;
        tracing::info!(
            schedule = created.id,
            account = created.account,
            recipient = created.recipient,
            "regular remittance registered"
        );
        Ok(created)
    }

    /// Change the amount sent on each execution
    pub async fn update_amount(
        &self,
        ctx: &ExecutionContext,
        client: ClientId,
        id: ScheduleId,
        amount: Decimal,
    ) -> Result<RegularRemittance, LedgerError> {
        ensure_positive(amount)?;
        let current = self.owned(client, id).await?;
        let update = ScheduleUpdate {
            amount: Some(amount),
            schedule: None,
        };

        self.locks
            .execute_with_lock(ctx, current.account, move || {
                self.store.update_regular_remittance(id, update)
            })
            .instrument(ctx.span("update_regular_remittance"))
            .await
    }

    /// Move the instruction to another day
    ///
    /// # Errors
    ///
    /// `DuplicateSchedule` if another instruction of the account already sends
    /// to the same recipient on that day.
    pub async fn update_schedule(
        &self,
        ctx: &ExecutionContext,
        client: ClientId,
        id: ScheduleId,
        new_schedule: Schedule,
    ) -> Result<RegularRemittance, LedgerError> {
        let current = self.owned(client, id).await?;

        self.locks
            .execute_with_lock(ctx, current.account, move || async move {
                let candidate = NewRegularRemittance {
                    account: current.account,
                    client: current.client,
                    recipient: current.recipient,
                    fee_policy: current.fee_policy,
                    from_currency: current.from_currency.clone(),
                    to_currency: current.to_currency.clone(),
                    amount: current.amount,
                    schedule: new_schedule,
                };
                let siblings = self
                    .store
                    .find_regular_remittances_by_account(current.account)
                    .await?;
                if siblings
                    .iter()
                    .any(|other| other.id != current.id && other.conflicts_with(&candidate))
                {
                    return Err(LedgerError::duplicate_schedule(
                        current.account,
                        current.recipient,
                    ));
                }

                let update = ScheduleUpdate {
                    amount: None,
                    schedule: Some(new_schedule),
                };
                self.store.update_regular_remittance(id, update).await
            })
            .instrument(ctx.span("update_regular_remittance"))
            .await
    }

    /// Stop executions until resumed; pausing twice is a no-op
    pub async fn pause(
        &self,
        ctx: &ExecutionContext,
        client: ClientId,
        id: ScheduleId,
    ) -> Result<(), LedgerError> {
        let current = self.owned(client, id).await?;

        let paused = self
            .locks
            .execute_with_lock(ctx, current.account, move || {
                self.store.transition_schedule_status(
                    id,
                    &[ScheduleStatus::Active, ScheduleStatus::Delayed],
                    ScheduleStatus::Paused,
                )
            })
            .instrument(ctx.span("pause_regular_remittance"))
            .await?;
        if paused {
            tracing::info!(schedule = id, "regular remittance paused");
        }
        Ok(())
    }

    /// Reactivate a paused instruction; other statuses are left as they are
    pub async fn resume(
        &self,
        ctx: &ExecutionContext,
        client: ClientId,
        id: ScheduleId,
    ) -> Result<(), LedgerError> {
        let current = self.owned(client, id).await?;

        let resumed = self
            .locks
            .execute_with_lock(ctx, current.account, move || {
                self.store.transition_schedule_status(
                    id,
                    &[ScheduleStatus::Paused],
                    ScheduleStatus::Active,
                )
            })
            .instrument(ctx.span("resume_regular_remittance"))
            .await?;
        if resumed {
            tracing::info!(schedule = id, "regular remittance resumed");
        }
        Ok(())
    }

    /// Remove the instruction; past executions are kept
    pub async fn delete(
        &self,
        ctx: &ExecutionContext,
        client: ClientId,
        id: ScheduleId,
    ) -> Result<(), LedgerError> {
        let current = self.owned(client, id).await?;

        self.locks
            .execute_with_lock(ctx, current.account, move || {
                self.store.delete_regular_remittance(id)
            })
            .instrument(ctx.span("delete_regular_remittance"))
            .await?;
        tracing::info!(schedule = id, "regular remittance deleted");
        Ok(())
    }

    /// Instructions of an account owned by `client`
    pub async fn list(
        &self,
        client: ClientId,
        account: AccountId,
    ) -> Result<Vec<RegularRemittance>, LedgerError> {
        let schedules = self
            .store
            .find_regular_remittances_by_account(account)
            .await?;
        Ok(schedules
            .into_iter()
            .filter(|schedule| schedule.client == client)
            .collect())
    }

    /// Executions produced by an instruction, oldest first
    pub async fn executions(
        &self,
        client: ClientId,
        id: ScheduleId,
    ) -> Result<Vec<OverseasRemittance>, LedgerError> {
        self.owned(client, id).await?;
        self.store.remittances_for_schedule(id).await
    }

    async fn owned(&self, client: ClientId, id: ScheduleId) -> Result<RegularRemittance, LedgerError> {
        let schedule = self
            .store
            .find_regular_remittance(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("regular remittance", id))?;
        if schedule.client != client {
            return Err(LedgerError::forbidden(
                client,
                format!("regular remittance {id}"),
            ));
        }
        Ok(schedule)
    }
}
