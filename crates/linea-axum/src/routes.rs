//! Route definitions and router construction.
//!
//! Axum 0.8 uses brace syntax for path parameters: `{id}`, `{to}`.

use axum::Router;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};

use crate::bootstrap::CorsConfig;
use crate::error::HttpError;
use crate::handlers;
use crate::middleware::{REQUEST_ID_HEADER, TRACEPARENT_HEADER, trace_requests};
use crate::state::AppState;

/// Build CORS layer from configuration.
///
/// Trace headers are always exposed so browsers can read them.
pub(crate) fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    let exposed = [
        HeaderName::from_static(TRACEPARENT_HEADER),
        HeaderName::from_static(REQUEST_ID_HEADER),
    ];
    match config {
        CorsConfig::AllowAll => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(exposed),
        CorsConfig::AllowOrigins(origins) => {
            let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            // Credentials rule out wildcards, so requested methods and headers are mirrored.
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_credentials(true)
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request())
                .expose_headers(exposed)
        }
    }
}

/// Catalog routes: categories, delivery options and products.
fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/categories",
            get(handlers::categories::list).post(handlers::categories::create),
        )
        .route("/categories/{id}", get(handlers::categories::get))
        .route(
            "/products",
            get(handlers::products::list).post(handlers::products::create),
        )
        .route(
            "/products/{id}",
            get(handlers::products::get)
                .put(handlers::products::update)
                .delete(handlers::products::remove),
        )
        .route("/products/{id}/image", get(handlers::products::image))
        // Storefront API
        .route("/api/categories", get(handlers::categories::list_non_empty))
        .route(
            "/api/delivery-options",
            get(handlers::delivery::list_active),
        )
        .route("/api/products", get(handlers::products::catalog))
        .route("/api/products/featured", get(handlers::products::featured))
}

/// Cart, checkout and currency routes.
fn commerce_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(handlers::checkout::cart_totals))
        .route("/cart/add", post(handlers::cart::add))
        .route("/cart/remove", post(handlers::cart::remove))
        .route("/cart/count/{product_id}", get(handlers::cart::count))
        .route("/checkout", post(handlers::checkout::checkout))
        .route("/orders", post(handlers::checkout::create_order))
        .route("/config/currencies", get(handlers::currencies::config))
        .route("/api/currencies", get(handlers::currencies::list))
        .route(
            "/api/currencies/rates/{to}",
            get(handlers::currencies::rate),
        )
        .route(
            "/api/currencies/convert",
            post(handlers::currencies::convert),
        )
        .route(
            "/api/currencies/refresh",
            post(handlers::currencies::refresh),
        )
}

/// Create the main Axum router with all routes.
///
/// Tracing wraps everything, CORS included, so preflight responses carry
/// request ids too.
pub fn create_router(state: AppState, cors_config: &CorsConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(catalog_routes())
        .merge(commerce_routes())
        .fallback(not_found)
        .with_state(state)
        .layer(build_cors_layer(cors_config))
        .layer(middleware::from_fn(trace_requests))
}

async fn not_found() -> HttpError {
    HttpError::NotFound("Not Found".to_string())
}
