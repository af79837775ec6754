//! Request extractors.
//!
//! `Db` resolves the session dependency per request. `ApiJson`, `ApiQuery`
//! and `ApiPath` wrap axum's extractors so malformed input becomes a
//! validation problem document instead of a plain-text rejection.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use linea_core::{Currency, FieldError};
use linea_db::DbSession;

use crate::error::HttpError;
use crate::state::AppState;

/// A session opened for this request and released when the handler returns.
#[derive(Debug)]
pub struct Db(pub DbSession);

impl FromRequestParts<AppState> for Db {
    type Rejection = HttpError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state.open_session().await.map(Self)
    }
}

#[derive(Debug, Deserialize)]
struct CurrencyQuery {
    currency: Option<String>,
}

/// The `?currency=` parameter, validated against the supported set.
///
/// Missing means the base currency. Codes are case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedCurrency(pub Currency);

impl FromRequestParts<AppState> for RequestedCurrency {
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ApiQuery(query) = ApiQuery::<CurrencyQuery>::from_request_parts(parts, state).await?;
        let Some(raw) = query.currency else {
            return Ok(Self(state.currency.base_currency()));
        };

        state.currency.parse_supported(&raw).map(Self).map_err(|_| {
            let supported = state
                .settings()
                .supported
                .iter()
                .map(|c| c.code())
                .collect::<Vec<_>>()
                .join(", ");
            HttpError::BadRequest(format!(
                "Currency '{raw}' is not supported. Supported currencies: {supported}"
            ))
        })
    }
}

/// JSON body extractor with problem-document rejections.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Query string extractor with problem-document rejections.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Path parameter extractor with problem-document rejections.
#[derive(Debug, Clone, Copy)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        let text = rejection.body_text();
        let field = missing_field(&text).unwrap_or("body").to_string();
        Self::InvalidFields(vec![FieldError::new(field, text)])
    }
}

impl From<QueryRejection> for HttpError {
    fn from(rejection: QueryRejection) -> Self {
        let text = rejection.body_text();
        let field = missing_field(&text).unwrap_or("query").to_string();
        Self::InvalidFields(vec![FieldError::new(field, text)])
    }
}

impl From<PathRejection> for HttpError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidFields(vec![FieldError::new("path", rejection.body_text())])
    }
}

/// Name from serde's "missing field `name`" message, if present.
fn missing_field(message: &str) -> Option<&str> {
    let start = message.find("missing field `")? + "missing field `".len();
    let rest = &message[start..];
    rest.find('`').map(|end| &rest[..end])
}
