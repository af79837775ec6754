//! Cart, checkout and order totals.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use linea_core::{Currency, FxMetadata, PriceInfo};

/// `GET /cart`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartTotals {
    pub subtotal: PriceInfo,
    pub delivery_cost: PriceInfo,
    pub total: PriceInfo,
    pub fx_metadata: Option<FxMetadata>,
}

/// `POST /checkout`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutTotals {
    pub currency: Currency,
    pub subtotal: PriceInfo,
    pub delivery_cost: PriceInfo,
    pub tax: PriceInfo,
    pub total: PriceInfo,
    pub fx_metadata: Option<FxMetadata>,
}

/// Rates in force when an order was placed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FxRatesSnapshot {
    /// Fetch time of the rate used for the order; null for base-currency orders.
    pub timestamp: Option<DateTime<Utc>>,
    pub base_currency: Currency,
    /// `"USD_EUR" -> "0.92"`.
    pub rates: BTreeMap<String, String>,
}

/// `POST /orders`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderTotals {
    #[serde(flatten)]
    pub totals: CheckoutTotals,
    pub fx_rates_snapshot: FxRatesSnapshot,
}
