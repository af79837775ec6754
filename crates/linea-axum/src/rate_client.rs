//! HTTP exchange rate provider.
//!
//! Talks to an exchangerate.host-style endpoint:
//! `GET <url>?base=USD&symbols=EUR,GBP` answering
//! `{"success": true, "rates": {"EUR": 0.92, ...}}`.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use linea_core::{Currency, RateProvider, RateProviderError};

/// Default endpoint for latest rates.
pub const DEFAULT_EXCHANGE_API_URL: &str = "https://api.exchangerate.host/latest";

/// Default request timeout.
pub const DEFAULT_EXCHANGE_API_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// `RateProvider` backed by an exchangerate.host-compatible API.
#[derive(Debug, Clone)]
pub struct ExchangeRateHostProvider {
    client: reqwest::Client,
    url: String,
}

impl ExchangeRateHostProvider {
    /// Build a provider for `url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `RateProviderError::Request` if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RateProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RateProviderError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RateProvider for ExchangeRateHostProvider {
    fn name(&self) -> &str {
        "exchangerate.host"
    }

    async fn latest(
        &self,
        base: Currency,
        targets: &[Currency],
    ) -> Result<BTreeMap<Currency, f64>, RateProviderError> {
        let symbols = targets
            .iter()
            .map(|c| c.code())
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .client
            .get(&self.url)
            .query(&[("base", base.code()), ("symbols", symbols.as_str())])
            .send()
            .await
            .map_err(|e| RateProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RateProviderError::Request(format!(
                "HTTP {} from {}",
                status.as_u16(),
                self.url
            )));
        }

        let payload: LatestRatesResponse = response
            .json()
            .await
            .map_err(|e| RateProviderError::InvalidResponse(e.to_string()))?;

        parse_rates(payload, targets)
    }
}

/// Keep the requested targets from a decoded payload.
fn parse_rates(
    payload: LatestRatesResponse,
    targets: &[Currency],
) -> Result<BTreeMap<Currency, f64>, RateProviderError> {
    if !payload.success {
        let reason = payload
            .error
            .map_or_else(|| "Unknown error".to_string(), |e| e.to_string());
        return Err(RateProviderError::InvalidResponse(format!("API error: {reason}")));
    }

    Ok(payload
        .rates
        .into_iter()
        .filter_map(|(code, rate)| {
            let currency = code.parse::<Currency>().ok()?;
            targets.contains(&currency).then_some((currency, rate))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> LatestRatesResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_keeps_requested_targets() {
        let rates = parse_rates(
            payload(r#"{"success": true, "rates": {"EUR": 0.92, "GBP": 0.79, "CHF": 0.88}}"#),
            &[Currency::Eur, Currency::Jpy],
        )
        .unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates.get(&Currency::Eur), Some(&0.92));
    }

    #[test]
    fn test_parse_reports_api_error() {
        let err = parse_rates(
            payload(r#"{"success": false, "error": {"info": "quota"}}"#),
            &[Currency::Eur],
        )
        .unwrap_err();
        assert!(err.to_string().contains("API error"));
        assert!(err.to_string().contains("quota"));
    }

    #[test]
    fn test_missing_success_flag_is_failure() {
        assert!(parse_rates(payload(r#"{"rates": {"EUR": 0.9}}"#), &[Currency::Eur]).is_err());
    }

    #[test]
    fn test_provider_builds() {
        let provider =
            ExchangeRateHostProvider::new(DEFAULT_EXCHANGE_API_URL, DEFAULT_EXCHANGE_API_TIMEOUT)
                .unwrap();
        assert_eq!(provider.name(), "exchangerate.host");
        assert_eq!(provider.url(), DEFAULT_EXCHANGE_API_URL);
    }
}
