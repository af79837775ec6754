//! Currency configuration and rate DTOs.

use serde::Serialize;

use linea_core::{Currency, CurrencyInfo};

/// `GET /config/currencies`.
#[derive(Debug, Clone, Serialize)]
pub struct SupportedCurrenciesResponse {
    pub base_currency: Currency,
    pub supported_currencies: Vec<CurrencyInfo>,
}

/// `GET /api/currencies/rates/{to}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeRateResponse {
    pub base_currency: Currency,
    pub target_currency: Currency,
    pub rate: f64,
}
