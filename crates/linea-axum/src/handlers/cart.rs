//! Cart count handlers.
//!
//! Counts are per shopper session: adding the same product twice from one
//! session leaves the count unchanged.

use axum::Json;

use linea_core::{CartCount, CartEntryRequest};

use crate::error::HttpError;
use crate::extract::{ApiJson, ApiPath, Db};

/// Record a product in a shopper's cart.
pub async fn add(
    Db(mut session): Db,
    ApiJson(req): ApiJson<CartEntryRequest>,
) -> Result<Json<CartCount>, HttpError> {
    if !session.products().exists(req.product_id).await? {
        return Err(HttpError::NotFound("Product not found".to_string()));
    }
    let count = session.cart().add(req.product_id, &req.session_id).await?;
    tracing::debug!(product_id = req.product_id, cart_count = count.cart_count, "Added to cart");
    Ok(Json(count))
}

/// Remove a product from a shopper's cart. Missing entries are not an error.
pub async fn remove(
    Db(mut session): Db,
    ApiJson(req): ApiJson<CartEntryRequest>,
) -> Result<Json<CartCount>, HttpError> {
    let count = session
        .cart()
        .remove(req.product_id, &req.session_id)
        .await?;
    tracing::debug!(product_id = req.product_id, cart_count = count.cart_count, "Removed from cart");
    Ok(Json(count))
}

/// Number of shopper sessions holding a product.
pub async fn count(
    Db(mut session): Db,
    ApiPath(product_id): ApiPath<i64>,
) -> Result<Json<CartCount>, HttpError> {
    Ok(Json(session.cart().count(product_id).await?))
}
