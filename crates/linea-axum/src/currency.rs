//! Currency service: cached exchange rates, refresh and conversion.
//!
//! Rates live in the `exchange_rates` table. A lookup uses the newest stored
//! rate while it is fresh, forces a refresh from the provider once it has
//! expired, and falls back to the expired rate if that refresh fails.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use linea_core::fx::convert_minor;
use linea_core::{
    CoreError, Currency, CurrencySettings, ExchangeRate, FxMetadata, PriceInfo, RateProvider,
};
use linea_db::DbSession;

/// Result of converting an amount between currencies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub amount_minor: i64,
    pub from_currency: Currency,
    pub to_currency: Currency,
    pub original_amount: i64,
}

/// A base-currency amount presented in the requested currency.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedPrice {
    pub price: PriceInfo,
    /// Present only when a conversion actually happened.
    pub fx_metadata: Option<FxMetadata>,
}

/// Rate lookups and conversions against stored rates and a provider.
#[derive(Clone)]
pub struct CurrencyService {
    settings: CurrencySettings,
    provider: Arc<dyn RateProvider>,
}

impl std::fmt::Debug for CurrencyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrencyService")
            .field("settings", &self.settings)
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl CurrencyService {
    pub fn new(settings: CurrencySettings, provider: Arc<dyn RateProvider>) -> Self {
        Self { settings, provider }
    }

    pub fn settings(&self) -> &CurrencySettings {
        &self.settings
    }

    pub fn base_currency(&self) -> Currency {
        self.settings.base_currency
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Parse a client-supplied code and check it against the supported set.
    pub fn parse_supported(&self, raw: &str) -> Result<Currency, CoreError> {
        raw.parse::<Currency>()
            .ok()
            .filter(|c| self.settings.is_supported(*c))
            .ok_or_else(|| CoreError::UnsupportedCurrency(raw.to_string()))
    }

    /// Exchange rate for `from -> to`.
    ///
    /// # Errors
    ///
    /// `CoreError::RateUnavailable` when nothing is stored and the provider
    /// cannot supply the pair.
    pub async fn get_rate(
        &self,
        session: &mut DbSession,
        from: Currency,
        to: Currency,
    ) -> Result<ExchangeRate, CoreError> {
        let now = Utc::now();
        if from == to {
            return Ok(ExchangeRate {
                base: from,
                target: to,
                rate: 1.0,
                fetched_at: now,
                expires_at: now + self.ttl(),
            });
        }

        let cached = self.cached_rate(session, from, to).await?;
        if let Some(rate) = cached.as_ref().filter(|r| !r.is_expired(now)) {
            tracing::debug!(from = %from, to = %to, rate = rate.rate, "Using cached rate");
            return Ok(rate.clone());
        }

        match self.refresh(session, true).await {
            Ok(_) => {
                if let Some(fresh) = self.cached_rate(session, from, to).await? {
                    return Ok(fresh);
                }
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to refresh rates");
                if let Some(stale) = cached {
                    tracing::warn!(from = %from, to = %to, rate = stale.rate, "Using expired cached rate");
                    return Ok(stale);
                }
            }
        }

        Err(CoreError::RateUnavailable {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    async fn cached_rate(
        &self,
        session: &mut DbSession,
        from: Currency,
        to: Currency,
    ) -> Result<Option<ExchangeRate>, CoreError> {
        let table = session.exchange_rates().latest().await?;
        Ok(table.lookup(from, to, self.settings.base_currency))
    }

    /// Fetch rates for every supported currency and store them.
    ///
    /// Without `force`, nothing happens while the newest base-currency
    /// snapshot is still fresh. Returns the number of rates stored.
    pub async fn refresh(&self, session: &mut DbSession, force: bool) -> Result<usize, CoreError> {
        let base = self.settings.base_currency;
        let now = Utc::now();

        if !force {
            let last = session.exchange_rates().last_fetched(base).await?;
            if last.is_some_and(|fetched| fetched + self.ttl() >= now) {
                tracing::debug!("Rates are still fresh, skipping refresh");
                return Ok(0);
            }
        }

        tracing::info!(provider = self.provider.name(), base = %base, "Refreshing exchange rates");
        let rates: BTreeMap<Currency, f64> = self
            .provider
            .latest(base, &self.settings.targets())
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to refresh exchange rates"))?;

        let stored = session
            .exchange_rates()
            .store(base, &rates, now, self.ttl())
            .await?;
        tracing::info!(count = stored, "Refreshed exchange rates");
        Ok(stored)
    }

    /// Convert minor units between two client-supplied currency codes.
    ///
    /// Identical known codes short-circuit before the supported-set check.
    pub async fn convert(
        &self,
        session: &mut DbSession,
        amount_minor: i64,
        from: &str,
        to: &str,
    ) -> Result<Conversion, CoreError> {
        let from_code = from.trim().to_ascii_uppercase();
        let to_code = to.trim().to_ascii_uppercase();

        if from_code == to_code {
            if let Ok(currency) = from_code.parse::<Currency>() {
                return Ok(Conversion {
                    amount_minor,
                    from_currency: currency,
                    to_currency: currency,
                    original_amount: amount_minor,
                });
            }
        }

        let from_currency = self.parse_supported(&from_code).map_err(|_| {
            CoreError::Validation(format!("Unsupported source currency: {from_code}"))
        })?;
        let to_currency = self.parse_supported(&to_code).map_err(|_| {
            CoreError::Validation(format!("Unsupported target currency: {to_code}"))
        })?;

        let amount = if from_currency == to_currency {
            amount_minor
        } else {
            let rate = self.get_rate(session, from_currency, to_currency).await?;
            convert_minor(amount_minor, from_currency, to_currency, rate.rate)
        };

        Ok(Conversion {
            amount_minor: amount,
            from_currency,
            to_currency,
            original_amount: amount_minor,
        })
    }

    /// Present a base-currency amount in `currency`.
    pub async fn price_in(
        &self,
        session: &mut DbSession,
        amount_minor: i64,
        currency: Currency,
    ) -> Result<ConvertedPrice, CoreError> {
        let base = self.settings.base_currency;
        if currency == base {
            return Ok(ConvertedPrice {
                price: PriceInfo::from_minor(amount_minor, base),
                fx_metadata: None,
            });
        }

        let rate = self.get_rate(session, base, currency).await?;
        let converted = convert_minor(amount_minor, base, currency, rate.rate);
        Ok(ConvertedPrice {
            price: PriceInfo::from_minor(converted, currency),
            fx_metadata: Some(self.metadata(&rate)),
        })
    }

    /// Snapshot `BASE_TARGET -> rate` for every supported target.
    ///
    /// Pairs without an obtainable rate are left out.
    pub async fn rates_snapshot(
        &self,
        session: &mut DbSession,
    ) -> Result<BTreeMap<String, String>, CoreError> {
        let base = self.settings.base_currency;
        let mut rates = BTreeMap::new();
        for target in self.settings.targets() {
            match self.get_rate(session, base, target).await {
                Ok(rate) => {
                    rates.insert(format!("{base}_{target}"), rate.rate.to_string());
                }
                Err(CoreError::RateUnavailable { .. }) => {
                    tracing::debug!(target = %target, "Rate unavailable, left out of snapshot");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(rates)
    }

    fn metadata(&self, rate: &ExchangeRate) -> FxMetadata {
        FxMetadata {
            rate: rate.rate,
            provider: self.provider.name().to_string(),
            timestamp: rate.fetched_at,
        }
    }

    fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.settings.fx_ttl_seconds).unwrap_or(i64::MAX))
    }

    /// When base-currency rates were last stored.
    pub async fn last_refreshed(
        &self,
        session: &mut DbSession,
    ) -> Result<Option<DateTime<Utc>>, CoreError> {
        Ok(session
            .exchange_rates()
            .last_fetched(self.settings.base_currency)
            .await?)
    }
}
