//! Catalog DTOs.
//!
//! Products never expose image bytes; clients get an `image_url` pointing at
//! the image endpoint instead.

use chrono::{DateTime, Utc};
use serde::Serialize;

use linea_core::{Category, DeliveryOption, DeliverySummary, Product};

/// Product as returned by every product endpoint.
///
/// `category`, `delivery_summary` and `cart_count` are always present in the
/// JSON and null unless the endpoint fills them in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category_id: i64,
    pub is_saved: bool,
    pub is_featured: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category: Option<Category>,
    pub delivery_summary: Option<DeliverySummary>,
    pub cart_count: Option<i64>,
}

impl ProductResponse {
    pub fn with_category(mut self, category: Option<Category>) -> Self {
        self.category = category;
        self
    }

    pub fn with_delivery_summary(mut self, summary: Option<DeliverySummary>) -> Self {
        self.delivery_summary = summary;
        self
    }

    pub fn with_cart_count(mut self, count: Option<i64>) -> Self {
        self.cart_count = count;
        self
    }
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        let image_url = product
            .has_image
            .then(|| format!("/products/{}/image", product.id));
        Self {
            id: product.id,
            title: product.title,
            description: product.description,
            price: product.price,
            category_id: product.category_id,
            is_saved: product.is_saved,
            is_featured: product.is_featured,
            image_url,
            created_at: product.created_at,
            updated_at: product.updated_at,
            category: None,
            delivery_summary: None,
            cart_count: None,
        }
    }
}

/// `GET /products/{id}`: the product plus its active delivery options.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: ProductResponse,
    pub delivery_options: Vec<DeliveryOption>,
}

/// `GET /categories/{id}`: the category plus its products.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub products: Vec<ProductResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(has_image: bool) -> Product {
        let now = Utc::now();
        Product {
            id: 7,
            title: "Lamp".to_string(),
            description: "Desk lamp".to_string(),
            price: 19.5,
            category_id: 2,
            is_saved: false,
            is_featured: true,
            has_image,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_image_url_only_when_image_stored() {
        assert_eq!(
            ProductResponse::from(product(true)).image_url.as_deref(),
            Some("/products/7/image")
        );
        assert!(ProductResponse::from(product(false)).image_url.is_none());
    }

    #[test]
    fn test_optional_fields_serialize_as_null() {
        let value = serde_json::to_value(ProductResponse::from(product(true))).unwrap();
        assert!(value["category"].is_null());
        assert!(value["delivery_summary"].is_null());
        assert!(value["cart_count"].is_null());
        assert!(value.get("has_image").is_none());
    }

    #[test]
    fn test_detail_flattens_product() {
        let detail = ProductDetail {
            product: product(false).into(),
            delivery_options: Vec::new(),
        };
        let value = serde_json::to_value(detail).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["delivery_options"], serde_json::json!([]));
    }
}
