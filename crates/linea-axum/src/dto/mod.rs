//! Data Transfer Objects (DTOs) for HTTP API contract.
//!
//! These types define the stable HTTP API contract with explicit serialization
//! control. They decouple internal domain types from external API representation.

pub mod catalog;
pub mod checkout;
pub mod currency;

use serde::{Deserialize, Serialize};

pub use catalog::{CategoryDetail, ProductDetail, ProductResponse};
pub use checkout::{CartTotals, CheckoutTotals, FxRatesSnapshot, OrderTotals};
pub use currency::{ExchangeRateResponse, SupportedCurrenciesResponse};

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// Plain acknowledgement body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
