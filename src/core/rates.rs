//! Exchange rates
//!
//! Rates are quoted against one base currency. Converting between two quoted
//! currencies goes through the base: `rate(from → to) = price(from) / price(to)`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::core::traits::ExchangeRateProvider;
use crate::types::LedgerError;

/// Scale kept on derived conversion rates
pub const RATE_SCALE: u32 = 8;

/// Fixed table of rates
#[derive(Debug, Clone, Default)]
pub struct StaticRateProvider {
    rates: HashMap<String, Decimal>,
}

impl StaticRateProvider {
    pub fn new(rates: HashMap<String, Decimal>) -> Self {
        StaticRateProvider { rates }
    }

    /// Add or replace the price of `currency` in the base currency
    pub fn with_rate(mut self, currency: &str, price: Decimal) -> Self {
        self.rates.insert(currency.to_string(), price);
        self
    }
}

#[async_trait]
impl ExchangeRateProvider for StaticRateProvider {
    async fn rates(&self) -> Result<HashMap<String, Decimal>, LedgerError> {
        Ok(self.rates.clone())
    }
}

/// Conversion rate from `from` to `to`
///
/// Converting a currency to itself is always `1`, quoted or not.
///
/// # Errors
///
/// `NotFound` if either currency has no positive quote.
pub fn conversion_rate(
    rates: &HashMap<String, Decimal>,
    from: &str,
    to: &str,
) -> Result<Decimal, LedgerError> {
    if from == to {
        return Ok(Decimal::ONE);
    }
    let price = |currency: &str| {
        rates
            .get(currency)
            .copied()
            .filter(|price| *price > Decimal::ZERO)
            .ok_or_else(|| LedgerError::not_found("exchange rate", currency))
    };

    let from_price = price(from)?;
    let to_price = price(to)?;
    from_price
        .checked_div(to_price)
        .map(|rate| rate.round_dp(RATE_SCALE))
        .ok_or_else(|| LedgerError::not_found("exchange rate", format!("{from}/{to}")))
}
