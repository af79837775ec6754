//! Delivery option handlers.

use axum::Json;

use linea_core::DeliveryOption;

use crate::error::HttpError;
use crate::extract::Db;

/// List active delivery options, fastest first, for filter dropdowns.
pub async fn list_active(Db(mut session): Db) -> Result<Json<Vec<DeliveryOption>>, HttpError> {
    Ok(Json(session.delivery_options().list_active().await?))
}
