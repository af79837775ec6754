//! Cart totals, checkout and orders in the shopper's currency.
//!
//! Amounts are a fixed demo basket in the base currency. Each line is
//! converted on its own and the total is the sum of the converted lines, so
//! totals never drift from what the shopper sees.

use axum::Json;
use axum::extract::State;

use linea_core::{Currency, FxMetadata, PriceInfo};
use linea_db::DbSession;

use crate::dto::{CartTotals, CheckoutTotals, FxRatesSnapshot, OrderTotals};
use crate::error::HttpError;
use crate::extract::{Db, RequestedCurrency};
use crate::state::AppState;

/// Demo basket subtotal, base-currency minor units.
pub const DEMO_SUBTOTAL_MINOR: i64 = 2999;
/// Demo delivery cost, base-currency minor units.
pub const DEMO_DELIVERY_MINOR: i64 = 599;
/// Demo tax, base-currency minor units.
pub const DEMO_TAX_MINOR: i64 = 240;

/// Converted basket lines plus the metadata of the first conversion.
struct ConvertedLines {
    lines: Vec<PriceInfo>,
    fx_metadata: Option<FxMetadata>,
}

impl ConvertedLines {
    fn total(&self, currency: Currency) -> PriceInfo {
        PriceInfo::from_minor(self.lines.iter().map(|l| l.amount_minor).sum(), currency)
    }
}

async fn convert_lines(
    state: &AppState,
    session: &mut DbSession,
    amounts: &[i64],
    currency: Currency,
) -> Result<ConvertedLines, HttpError> {
    let mut lines = Vec::with_capacity(amounts.len());
    let mut fx_metadata = None;
    for &amount in amounts {
        let converted = state.currency.price_in(session, amount, currency).await?;
        if fx_metadata.is_none() {
            fx_metadata = converted.fx_metadata;
        }
        lines.push(converted.price);
    }
    Ok(ConvertedLines { lines, fx_metadata })
}

async fn checkout_totals(
    state: &AppState,
    session: &mut DbSession,
    currency: Currency,
) -> Result<CheckoutTotals, HttpError> {
    let converted = convert_lines(
        state,
        session,
        &[DEMO_SUBTOTAL_MINOR, DEMO_DELIVERY_MINOR, DEMO_TAX_MINOR],
        currency,
    )
    .await?;
    let total = converted.total(currency);
    let [subtotal, delivery_cost, tax] = converted.lines[..] else {
        return Err(HttpError::Internal("Checkout lines missing".to_string()));
    };

    Ok(CheckoutTotals {
        currency,
        subtotal,
        delivery_cost,
        tax,
        total,
        fx_metadata: converted.fx_metadata,
    })
}

/// Cart totals in the requested currency.
pub async fn cart_totals(
    State(state): State<AppState>,
    Db(mut session): Db,
    RequestedCurrency(currency): RequestedCurrency,
) -> Result<Json<CartTotals>, HttpError> {
    let converted = convert_lines(
        &state,
        &mut session,
        &[DEMO_SUBTOTAL_MINOR, DEMO_DELIVERY_MINOR],
        currency,
    )
    .await?;
    let total = converted.total(currency);
    let [subtotal, delivery_cost] = converted.lines[..] else {
        return Err(HttpError::Internal("Cart lines missing".to_string()));
    };

    Ok(Json(CartTotals {
        subtotal,
        delivery_cost,
        total,
        fx_metadata: converted.fx_metadata,
    }))
}

/// Checkout totals including tax.
pub async fn checkout(
    State(state): State<AppState>,
    Db(mut session): Db,
    RequestedCurrency(currency): RequestedCurrency,
) -> Result<Json<CheckoutTotals>, HttpError> {
    Ok(Json(checkout_totals(&state, &mut session, currency).await?))
}

/// Place an order, recording the rates in force.
pub async fn create_order(
    State(state): State<AppState>,
    Db(mut session): Db,
    RequestedCurrency(currency): RequestedCurrency,
) -> Result<Json<OrderTotals>, HttpError> {
    let totals = checkout_totals(&state, &mut session, currency).await?;
    let rates = state.currency.rates_snapshot(&mut session).await?;

    let fx_rates_snapshot = FxRatesSnapshot {
        timestamp: totals.fx_metadata.as_ref().map(|m| m.timestamp),
        base_currency: state.currency.base_currency(),
        rates,
    };
    tracing::info!(
        currency = %currency,
        total_minor = totals.total.amount_minor,
        snapshot_rates = fx_rates_snapshot.rates.len(),
        "Order created"
    );

    Ok(Json(OrderTotals {
        totals,
        fx_rates_snapshot,
    }))
}
