//! Product handlers - catalog listing, CRUD and images.

use std::collections::HashMap;

use axum::Json;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use linea_core::{
    Category, DEFAULT_FEATURED_LIMIT, DeliverySummary, FEATURED_LIMIT_RANGE, NewProduct, Product,
    ProductSort, ProductUpdate, pick_featured, sort_for_display,
};
use linea_db::{DbSession, ProductFilter};

use crate::dto::{MessageResponse, ProductDetail, ProductResponse};
use crate::error::HttpError;
use crate::extract::{ApiJson, ApiPath, ApiQuery, Db};

/// Query for `GET /products`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category_id: Option<i64>,
    #[serde(default)]
    pub include_delivery_summary: bool,
}

/// Query for `GET /api/products`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogQuery {
    pub category_id: Option<i64>,
    pub delivery_option_id: Option<i64>,
    pub sort: Option<String>,
    #[serde(default = "default_true", rename = "include_delivery_summary")]
    pub include_delivery_summary: bool,
    #[serde(default, rename = "include_cart_count")]
    pub include_cart_count: bool,
}

const fn default_true() -> bool {
    true
}

/// Query for `GET /api/products/featured`.
#[derive(Debug, Default, Deserialize)]
pub struct FeaturedQuery {
    pub limit: Option<usize>,
}

/// List products, optionally in one category.
pub async fn list(
    Db(mut session): Db,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<ProductResponse>>, HttpError> {
    let filter = ProductFilter {
        category_id: query.category_id,
        ..ProductFilter::default()
    };
    let products = session.products().list(&filter).await?;
    let listing = with_catalog_details(&mut session, products, query.include_delivery_summary, false)
        .await?;
    Ok(Json(listing))
}

/// Storefront listing with delivery filtering, sorting and cart counts.
pub async fn catalog(
    Db(mut session): Db,
    ApiQuery(query): ApiQuery<CatalogQuery>,
) -> Result<Json<Vec<ProductResponse>>, HttpError> {
    let filter = ProductFilter {
        category_id: query.category_id,
        delivery_option_id: query.delivery_option_id,
        sort: query.sort.as_deref().map(ProductSort::parse).unwrap_or_default(),
    };
    let products = session.products().list(&filter).await?;
    let listing = with_catalog_details(
        &mut session,
        products,
        query.include_delivery_summary,
        query.include_cart_count,
    )
    .await?;
    Ok(Json(listing))
}

/// Featured products, topped up with popular and then new ones.
pub async fn featured(
    Db(mut session): Db,
    ApiQuery(query): ApiQuery<FeaturedQuery>,
) -> Result<Json<Vec<ProductResponse>>, HttpError> {
    let limit = query.limit.unwrap_or(DEFAULT_FEATURED_LIMIT);
    if !FEATURED_LIMIT_RANGE.contains(&limit) {
        return Err(HttpError::Unprocessable(format!(
            "limit must be between {} and {}",
            FEATURED_LIMIT_RANGE.start(),
            FEATURED_LIMIT_RANGE.end()
        )));
    }

    let newest_first = session.products().list(&ProductFilter::default()).await?;
    let cart_counts = session.cart().counts().await?;
    let picked = pick_featured(&newest_first, &cart_counts, limit);
    tracing::debug!(limit, returned = picked.len(), "Featured products picked");

    let categories = categories_by_id(&mut session).await?;
    Ok(Json(
        picked
            .into_iter()
            .map(|p| {
                let category = categories.get(&p.category_id).cloned();
                ProductResponse::from(p).with_category(category)
            })
            .collect(),
    ))
}

/// Create a product in an existing category.
pub async fn create(
    Db(mut session): Db,
    ApiJson(req): ApiJson<NewProduct>,
) -> Result<Json<ProductResponse>, HttpError> {
    let req = req.validate()?;
    if !session.categories().exists(req.category_id).await? {
        return Err(HttpError::BadRequest("Category not found".to_string()));
    }

    let product = session.products().create(&req).await?;
    tracing::info!(product_id = product.id, "Product created");
    Ok(Json(product.into()))
}

/// Get a product with its category and active delivery options.
pub async fn get(
    Db(mut session): Db,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ProductDetail>, HttpError> {
    let product = session.products().get(id).await?;
    let category = session.categories().get(product.category_id).await.ok();
    let options = session.delivery_options().for_product(id).await?;

    Ok(Json(ProductDetail {
        product: ProductResponse::from(product).with_category(category),
        delivery_options: sort_for_display(options),
    }))
}

/// Apply a partial update to a product.
pub async fn update(
    Db(mut session): Db,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ProductUpdate>,
) -> Result<Json<ProductResponse>, HttpError> {
    let req = req.validate()?;
    if let Some(category_id) = req.category_id {
        if !session.categories().exists(category_id).await? {
            return Err(HttpError::BadRequest("Category not found".to_string()));
        }
    }

    let product = session.products().update(id, &req).await?;
    tracing::info!(product_id = id, "Product updated");
    Ok(Json(product.into()))
}

/// Delete a product.
pub async fn remove(
    Db(mut session): Db,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, HttpError> {
    session.products().delete(id).await?;
    tracing::info!(product_id = id, "Product deleted");
    Ok(Json(MessageResponse::new("Product deleted successfully")))
}

/// Serve a product's stored image bytes.
pub async fn image(
    Db(mut session): Db,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, HttpError> {
    let image = session
        .products()
        .image(id)
        .await?
        .ok_or_else(|| HttpError::NotFound("No image found for this product".to_string()))?;

    let content_type = HeaderValue::from_str(image.content_type())
        .unwrap_or_else(|_| HeaderValue::from_static("image/jpeg"));
    let disposition = HeaderValue::from_str(&format!(
        "inline; filename=\"{}\"",
        image.display_filename(id)
    ))
    .map_err(|e| HttpError::Internal(format!("Invalid image filename: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=86400"),
            ),
        ],
        image.data,
    )
        .into_response())
}

async fn categories_by_id(session: &mut DbSession) -> Result<HashMap<i64, Category>, HttpError> {
    Ok(session
        .categories()
        .list()
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect())
}

/// Attach categories and, on request, delivery summaries and cart counts.
async fn with_catalog_details(
    session: &mut DbSession,
    products: Vec<Product>,
    include_delivery_summary: bool,
    include_cart_count: bool,
) -> Result<Vec<ProductResponse>, HttpError> {
    let categories = categories_by_id(session).await?;

    let mut options = if include_delivery_summary {
        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        session.delivery_options().for_products(&ids).await?
    } else {
        HashMap::new()
    };

    let cart_counts = if include_cart_count {
        Some(session.cart().counts().await?)
    } else {
        None
    };

    Ok(products
        .into_iter()
        .map(|product| {
            let id = product.id;
            let category = categories.get(&product.category_id).cloned();
            let summary = options
                .remove(&id)
                .and_then(|opts| DeliverySummary::from_options(&opts));
            let cart_count = cart_counts
                .as_ref()
                .map(|counts| counts.get(&id).copied().unwrap_or(0));

            ProductResponse::from(product)
                .with_category(category)
                .with_delivery_summary(summary)
                .with_cart_count(cart_count)
        })
        .collect())
}
