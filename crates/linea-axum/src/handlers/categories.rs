//! Category handlers.

use axum::Json;

use linea_core::{Category, NewCategory};
use linea_db::ProductFilter;

use crate::dto::{CategoryDetail, ProductResponse};
use crate::error::HttpError;
use crate::extract::{ApiJson, ApiPath, Db};

/// List all categories.
pub async fn list(Db(mut session): Db) -> Result<Json<Vec<Category>>, HttpError> {
    Ok(Json(session.categories().list().await?))
}

/// List categories that have at least one product, by name.
pub async fn list_non_empty(Db(mut session): Db) -> Result<Json<Vec<Category>>, HttpError> {
    Ok(Json(session.categories().list_non_empty().await?))
}

/// Create a category. Names are unique.
pub async fn create(
    Db(mut session): Db,
    ApiJson(req): ApiJson<NewCategory>,
) -> Result<Json<Category>, HttpError> {
    let req = req.validate()?;
    let category = session.categories().create(&req).await?;
    tracing::info!(category_id = category.id, name = %category.name, "Category created");
    Ok(Json(category))
}

/// Get a category with its products.
pub async fn get(
    Db(mut session): Db,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<CategoryDetail>, HttpError> {
    let category = session.categories().get(id).await?;
    let mut products = session
        .products()
        .list(&ProductFilter::in_category(id))
        .await?;
    products.sort_by_key(|p| p.id);

    Ok(Json(CategoryDetail {
        category,
        products: products.into_iter().map(ProductResponse::from).collect(),
    }))
}
