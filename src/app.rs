//! Service wiring
//!
//! Builds every service over one store, lock manager and rate provider.

use std::sync::Arc;

use crate::config::Config;
use crate::core::{
    AccountLockCoordinator, AccountService, ExchangeRateProvider, ExchangeService,
    InMemoryLockManager, LedgerStore, LockManager, RedisLockManager, RegularRemittanceScheduler,
    RegularRemittanceService, RemittanceProcessor, RemittanceService, TransactionEngine,
};
use crate::types::LockError;

/// Every ledger service, sharing one store and one lock coordinator
pub struct LedgerServices {
    pub accounts: AccountService,
    pub exchange: ExchangeService,
    pub remittances: Arc<RemittanceService>,
    pub regular_remittances: RegularRemittanceService,
    pub scheduler: RegularRemittanceScheduler,
}

impl LedgerServices {
    pub fn build(
        config: &Config,
        store: Arc<dyn LedgerStore>,
        lock_manager: Arc<dyn LockManager>,
        rates: Arc<dyn ExchangeRateProvider>,
    ) -> Self {
        let engine = Arc::new(TransactionEngine::standard(store.clone()));
        let locks = Arc::new(AccountLockCoordinator::new(
            lock_manager,
            config.lock_config(),
        ));
        let processor = Arc::new(RemittanceProcessor::new(
            store.clone(),
            engine.clone(),
            rates.clone(),
        ));
        let remittances = Arc::new(RemittanceService::new(
            store.clone(),
            locks.clone(),
            processor,
        ));

        LedgerServices {
            accounts: AccountService::new(store.clone(), engine.clone(), locks.clone()),
            exchange: ExchangeService::new(store.clone(), engine, locks.clone(), rates),
            regular_remittances: RegularRemittanceService::new(store.clone(), locks),
            scheduler: RegularRemittanceScheduler::new(
                store,
                remittances.clone(),
                config.scheduler_config(),
            ),
            remittances,
        }
    }
}

/// Redis lock manager when `redis_url` is set, in-process otherwise
pub fn lock_manager_from_config(config: &Config) -> Result<Arc<dyn LockManager>, LockError> {
    let lock_config = config.lock_config();
    match &config.redis_url {
        Some(url) => {
            tracing::info!("using redis lock backend");
            Ok(Arc::new(RedisLockManager::new(
                url,
                lock_config.retry_interval,
            )?))
        }
        None => {
            tracing::info!("using in-process lock backend");
            Ok(Arc::new(InMemoryLockManager::new(
                lock_config.retry_interval,
            )))
        }
    }
}
