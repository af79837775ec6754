//! Liveness probe.

use axum::Json;

use crate::dto::HealthResponse;

/// Report that the service is up.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "E-commerce API with multi-currency support is running".to_string(),
    })
}
