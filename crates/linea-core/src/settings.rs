//! Currency settings.
//!
//! Pure configuration types; reading the process environment is the only
//! side effect, and it goes through an injectable lookup.

use std::time::Duration;

use crate::money::Currency;

/// Default lifetime of fetched exchange rates.
pub const DEFAULT_FX_TTL_SECONDS: u64 = 3600;

/// Floor for the background refresh interval.
pub const MIN_REFRESH_INTERVAL_SECONDS: u64 = 300;

/// Which currencies the store prices in and how long rates stay fresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencySettings {
    /// Currency all catalog prices are stored in.
    pub base_currency: Currency,
    /// Currencies clients may request, in display order.
    pub supported: Vec<Currency>,
    /// Seconds before a fetched rate is considered stale.
    pub fx_ttl_seconds: u64,
}

impl Default for CurrencySettings {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl CurrencySettings {
    /// USD base, every known currency, one hour TTL.
    pub fn with_defaults() -> Self {
        Self {
            base_currency: Currency::Usd,
            supported: Currency::ALL.to_vec(),
            fx_ttl_seconds: DEFAULT_FX_TTL_SECONDS,
        }
    }

    /// Read `BASE_CURRENCY`, `SUPPORTED_CURRENCIES` and `FX_TTL_SECONDS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    ///
    /// Invalid values are logged and replaced by defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::with_defaults();

        if let Some(raw) = lookup("BASE_CURRENCY") {
            match raw.parse::<Currency>() {
                Ok(currency) => settings.base_currency = currency,
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring BASE_CURRENCY"),
            }
        }

        if let Some(raw) = lookup("SUPPORTED_CURRENCIES") {
            let mut supported = Vec::new();
            for code in raw.split(',').filter(|c| !c.trim().is_empty()) {
                match code.parse::<Currency>() {
                    Ok(currency) if !supported.contains(&currency) => supported.push(currency),
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(value = %code, error = %e, "Ignoring supported currency");
                    }
                }
            }
            if !supported.is_empty() {
                settings.supported = supported;
            }
        }

        if let Some(raw) = lookup("FX_TTL_SECONDS") {
            match raw.trim().parse::<u64>() {
                Ok(ttl) => settings.fx_ttl_seconds = ttl,
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring FX_TTL_SECONDS"),
            }
        }

        // Conversions are always expressed relative to the base.
        if !settings.supported.contains(&settings.base_currency) {
            settings.supported.insert(0, settings.base_currency);
        }

        settings
    }

    pub fn is_supported(&self, currency: Currency) -> bool {
        self.supported.contains(&currency)
    }

    /// Supported currencies other than the base.
    pub fn targets(&self) -> Vec<Currency> {
        self.supported
            .iter()
            .copied()
            .filter(|c| *c != self.base_currency)
            .collect()
    }

    pub const fn fx_ttl(&self) -> Duration {
        Duration::from_secs(self.fx_ttl_seconds)
    }

    /// Background refresh runs at half the TTL, but not more often than every five minutes.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs((self.fx_ttl_seconds / 2).max(MIN_REFRESH_INTERVAL_SECONDS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = CurrencySettings::from_lookup(|_| None);
        assert_eq!(settings, CurrencySettings::with_defaults());
        assert_eq!(settings.targets().len(), 5);
        assert_eq!(settings.refresh_interval(), Duration::from_secs(1800));
    }

    #[test]
    fn test_env_overrides() {
        let settings = CurrencySettings::from_lookup(lookup_from(&[
            ("BASE_CURRENCY", "eur"),
            ("SUPPORTED_CURRENCIES", "EUR,USD,XYZ,USD"),
            ("FX_TTL_SECONDS", "120"),
        ]));
        assert_eq!(settings.base_currency, Currency::Eur);
        assert_eq!(settings.supported, vec![Currency::Eur, Currency::Usd]);
        assert_eq!(settings.refresh_interval(), Duration::from_secs(300));
    }

    #[test]
    fn test_base_always_supported() {
        let settings = CurrencySettings::from_lookup(lookup_from(&[
            ("BASE_CURRENCY", "GBP"),
            ("SUPPORTED_CURRENCIES", "USD,JPY"),
        ]));
        assert_eq!(
            settings.supported,
            vec![Currency::Gbp, Currency::Usd, Currency::Jpy]
        );
        assert!(settings.is_supported(Currency::Gbp));
        assert!(!settings.is_supported(Currency::Eur));
    }
}
