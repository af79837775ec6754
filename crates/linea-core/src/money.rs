//! Currencies and minor-unit money amounts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ports::CoreError;

/// ISO 4217 currencies the store can price in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Jpy,
    Aud,
    Mxn,
}

impl Default for Currency {
    fn default() -> Self {
        Self::Usd
    }
}

impl Currency {
    /// Every known currency, in display order.
    pub const ALL: [Self; 6] = [
        Self::Usd,
        Self::Eur,
        Self::Gbp,
        Self::Jpy,
        Self::Aud,
        Self::Mxn,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Jpy => "JPY",
            Self::Aud => "AUD",
            Self::Mxn => "MXN",
        }
    }

    /// Number of minor-unit digits. Yen has none.
    pub const fn decimals(self) -> u32 {
        match self {
            Self::Jpy => 0,
            _ => 2,
        }
    }

    /// Minor units per major unit (100 for cents, 1 for yen).
    pub const fn minor_per_major(self) -> i64 {
        10_i64.pow(self.decimals())
    }

    pub const fn info(self) -> CurrencyInfo {
        let (name, symbol) = match self {
            Self::Usd => ("US Dollar", "$"),
            Self::Eur => ("Euro", "€"),
            Self::Gbp => ("British Pound", "£"),
            Self::Jpy => ("Japanese Yen", "¥"),
            Self::Aud => ("Australian Dollar", "A$"),
            Self::Mxn => ("Mexican Peso", "MX$"),
        };
        CurrencyInfo {
            code: self.code(),
            name,
            symbol,
            decimal_places: self.decimals(),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = CoreError;

    /// Case-insensitive parse of a currency code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|c| c.code() == upper)
            .ok_or_else(|| CoreError::UnsupportedCurrency(s.to_string()))
    }
}

/// Display metadata for a currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurrencyInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimal_places: u32,
}

/// An amount of money in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount_minor: i64,
    #[serde(default)]
    pub currency: Currency,
}

impl Money {
    /// Build from minor units, rejecting negative amounts.
    pub fn new(amount_minor: i64, currency: Currency) -> Result<Self, CoreError> {
        if amount_minor < 0 {
            return Err(CoreError::Validation(
                "Amount must be non-negative".to_string(),
            ));
        }
        Ok(Self {
            amount_minor,
            currency,
        })
    }

    /// Build from major units, rounding half away from zero.
    pub fn from_amount(amount: f64, currency: Currency) -> Result<Self, CoreError> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let minor = (amount * currency.minor_per_major() as f64).round() as i64;
        Self::new(minor, currency)
    }

    /// Amount in major units (dollars, euros, yen).
    #[allow(clippy::cast_precision_loss)]
    pub fn amount(&self) -> f64 {
        self.amount_minor as f64 / self.currency.minor_per_major() as f64
    }
}

/// A price as presented to clients: both representations plus the currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceInfo {
    pub amount: f64,
    pub amount_minor: i64,
    pub currency: Currency,
}

impl From<Money> for PriceInfo {
    fn from(money: Money) -> Self {
        Self {
            amount: money.amount(),
            amount_minor: money.amount_minor,
            currency: money.currency,
        }
    }
}

impl PriceInfo {
    /// Build directly from minor units without the non-negative check.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_minor(amount_minor: i64, currency: Currency) -> Self {
        Self {
            amount: amount_minor as f64 / currency.minor_per_major() as f64,
            amount_minor,
            currency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_converts_cents_to_dollars() {
        let money = Money::new(2999, Currency::Usd).unwrap();
        assert!((money.amount() - 29.99).abs() < 1e-9);
    }

    #[test]
    fn test_yen_has_no_minor_units() {
        let money = Money::new(1500, Currency::Jpy).unwrap();
        assert!((money.amount() - 1500.0).abs() < f64::EPSILON);
        assert_eq!(Money::from_amount(1499.6, Currency::Jpy).unwrap().amount_minor, 1500);
    }

    #[test]
    fn test_from_amount_rounds_half_up() {
        assert_eq!(Money::from_amount(0.125, Currency::Eur).unwrap().amount_minor, 13);
        assert_eq!(Money::from_amount(29.99, Currency::Usd).unwrap().amount_minor, 2999);
    }

    #[test]
    fn test_negative_amount_rejected() {
        tokio_test::assert_err!(Money::new(-1, Currency::Usd));
    }

    #[test]
    fn test_currency_parse_is_case_insensitive() {
        assert_eq!("eur".parse::<Currency>().unwrap(), Currency::Eur);
        assert_eq!(" GBP ".parse::<Currency>().unwrap(), Currency::Gbp);
        assert!(matches!(
            "XYZ".parse::<Currency>(),
            Err(CoreError::UnsupportedCurrency(code)) if code == "XYZ"
        ));
    }

    #[test]
    fn test_currency_serializes_as_code() {
        assert_eq!(serde_json::to_string(&Currency::Mxn).unwrap(), "\"MXN\"");
        let info = Currency::Jpy.info();
        assert_eq!(info.symbol, "¥");
        assert_eq!(info.decimal_places, 0);
    }
}
