//! Currency handlers - configuration, rates, conversion and refresh.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use linea_core::Currency;

use crate::currency::Conversion;
use crate::dto::{ExchangeRateResponse, MessageResponse, SupportedCurrenciesResponse};
use crate::error::HttpError;
use crate::extract::{ApiPath, ApiQuery, Db};
use crate::state::AppState;

/// Query for `POST /api/currencies/convert`.
#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub amount_minor: i64,
    pub from_currency: String,
    pub to_currency: String,
}

/// Query for `POST /api/currencies/refresh`.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    #[serde(default)]
    pub force: bool,
}

/// Base currency and display metadata for every supported currency.
pub async fn config(State(state): State<AppState>) -> Json<SupportedCurrenciesResponse> {
    let settings = state.settings();
    Json(SupportedCurrenciesResponse {
        base_currency: settings.base_currency,
        supported_currencies: settings.supported.iter().map(|c| c.info()).collect(),
    })
}

/// Supported currency codes.
pub async fn list(State(state): State<AppState>) -> Json<Vec<Currency>> {
    Json(state.settings().supported.clone())
}

/// Rate from the base currency to `to`.
pub async fn rate(
    State(state): State<AppState>,
    Db(mut session): Db,
    ApiPath(to): ApiPath<String>,
) -> Result<Json<ExchangeRateResponse>, HttpError> {
    let target = state.currency.parse_supported(&to).map_err(|_| {
        HttpError::BadRequest(format!(
            "Unsupported target currency: {}",
            to.trim().to_ascii_uppercase()
        ))
    })?;
    let base = state.currency.base_currency();
    let rate = state.currency.get_rate(&mut session, base, target).await?;

    Ok(Json(ExchangeRateResponse {
        base_currency: base,
        target_currency: target,
        rate: rate.rate,
    }))
}

/// Convert an amount in minor units between two currencies.
pub async fn convert(
    State(state): State<AppState>,
    Db(mut session): Db,
    ApiQuery(query): ApiQuery<ConvertQuery>,
) -> Result<Json<Conversion>, HttpError> {
    let conversion = state
        .currency
        .convert(
            &mut session,
            query.amount_minor,
            &query.from_currency,
            &query.to_currency,
        )
        .await?;
    Ok(Json(conversion))
}

/// Fetch fresh rates from the provider.
///
/// Without `force`, nothing is fetched while stored rates are fresh.
pub async fn refresh(
    State(state): State<AppState>,
    Db(mut session): Db,
    ApiQuery(query): ApiQuery<RefreshQuery>,
) -> Result<Json<MessageResponse>, HttpError> {
    state
        .currency
        .refresh(&mut session, query.force)
        .await
        .map_err(|e| HttpError::ServiceUnavailable(format!("Failed to refresh rates: {e}")))?;
    Ok(Json(MessageResponse::new(
        "Exchange rates refreshed successfully",
    )))
}
