//! Exchange rates and currency conversion.
//!
//! Rates are stored relative to a base currency. Lookups fall back from a
//! direct pair to its inverse, and finally to a cross rate through the base.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Currency;

/// One stored exchange rate: `1 base = rate target`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub base: Currency,
    pub target: Currency,
    pub rate: f64,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ExchangeRate {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Conversion details attached to converted prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxMetadata {
    pub rate: f64,
    pub provider: String,
    pub timestamp: DateTime<Utc>,
}

/// An in-memory snapshot of known rates.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: Vec<ExchangeRate>,
}

impl RateTable {
    pub fn new(rates: Vec<ExchangeRate>) -> Self {
        Self { rates }
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn rates(&self) -> &[ExchangeRate] {
        &self.rates
    }

    /// Most recent fetch time across all rates.
    pub fn latest_fetch(&self) -> Option<DateTime<Utc>> {
        self.rates.iter().map(|r| r.fetched_at).max()
    }

    fn direct(&self, from: Currency, to: Currency) -> Option<&ExchangeRate> {
        self.rates
            .iter()
            .filter(|r| r.base == from && r.target == to)
            .max_by_key(|r| r.fetched_at)
    }

    /// Find a rate for `from -> to`.
    ///
    /// Synthesized rates (inverse or cross) carry the oldest timestamps of
    /// the rates they were built from.
    pub fn lookup(&self, from: Currency, to: Currency, base: Currency) -> Option<ExchangeRate> {
        if let Some(rate) = self.direct(from, to) {
            return Some(rate.clone());
        }

        if let Some(inverse) = self.direct(to, from) {
            if inverse.rate != 0.0 {
                return Some(ExchangeRate {
                    base: from,
                    target: to,
                    rate: 1.0 / inverse.rate,
                    fetched_at: inverse.fetched_at,
                    expires_at: inverse.expires_at,
                });
            }
        }

        if from != base && to != base {
            let from_base = self.lookup(base, from, base)?;
            let to_base = self.lookup(base, to, base)?;
            if from_base.rate == 0.0 {
                return None;
            }
            return Some(ExchangeRate {
                base: from,
                target: to,
                rate: to_base.rate / from_base.rate,
                fetched_at: from_base.fetched_at.min(to_base.fetched_at),
                expires_at: from_base.expires_at.min(to_base.expires_at),
            });
        }

        None
    }
}

/// Convert minor units between currencies at the given rate.
///
/// The amount passes through major units so currencies with different
/// minor-unit digits (USD cents vs. yen) convert correctly; the result is
/// rounded half away from zero.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
pub fn convert_minor(amount_minor: i64, from: Currency, to: Currency, rate: f64) -> i64 {
    if from == to {
        return amount_minor;
    }
    let major = amount_minor as f64 / from.minor_per_major() as f64;
    let converted = major * rate * to.minor_per_major() as f64;
    converted.round() as i64
}
