//! Exchange rate provider port.
//!
//! Implementations fetch the latest rates from an external source. The
//! store persists whatever the provider returns; freshness policy lives
//! with the caller.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::money::Currency;

/// Errors returned by rate providers.
#[derive(Debug, Error)]
pub enum RateProviderError {
    /// Transport-level failure (DNS, timeout, non-2xx).
    #[error("Request failed: {0}")]
    Request(String),

    /// The provider answered but the payload was unusable.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No provider is configured.
    #[error("Rate provider disabled")]
    Disabled,
}

/// Source of exchange rates relative to a base currency.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Short provider name recorded with converted prices.
    fn name(&self) -> &str;

    /// Fetch `1 base = rate target` for each requested target.
    ///
    /// Targets the provider does not know are omitted from the result.
    async fn latest(
        &self,
        base: Currency,
        targets: &[Currency],
    ) -> Result<BTreeMap<Currency, f64>, RateProviderError>;
}

/// Provider returning a fixed table. Used when no network source is wanted.
#[derive(Debug, Clone, Default)]
pub struct StaticRateProvider {
    rates: BTreeMap<Currency, f64>,
}

impl StaticRateProvider {
    pub fn new(rates: impl IntoIterator<Item = (Currency, f64)>) -> Self {
        Self {
            rates: rates.into_iter().collect(),
        }
    }
}

#[async_trait]
impl RateProvider for StaticRateProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn latest(
        &self,
        _base: Currency,
        targets: &[Currency],
    ) -> Result<BTreeMap<Currency, f64>, RateProviderError> {
        Ok(targets
            .iter()
            .filter_map(|c| self.rates.get(c).map(|r| (*c, *r)))
            .collect())
    }
}

/// Provider that always fails; stands in when rates must come from storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRateProvider;

#[async_trait]
impl RateProvider for DisabledRateProvider {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn latest(
        &self,
        _base: Currency,
        _targets: &[Currency],
    ) -> Result<BTreeMap<Currency, f64>, RateProviderError> {
        Err(RateProviderError::Disabled)
    }
}
