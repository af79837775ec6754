//! Catalog domain types: categories and products.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FieldError, has_two_decimals, non_blank};
use crate::ports::CoreError;

// ─────────────────────────────────────────────────────────────────────────────
// Categories
// ─────────────────────────────────────────────────────────────────────────────

/// A persisted product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    /// Unique display name.
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
}

impl NewCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Trim the name and reject blank values.
    pub fn validate(self) -> Result<Self, CoreError> {
        let mut errors = Vec::new();
        let name = non_blank("name", &self.name, &mut errors);
        match name {
            Some(name) => Ok(Self { name }),
            None => Err(CoreError::InvalidFields(errors)),
        }
    }
}

/// A category together with the products assigned to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWithProducts {
    #[serde(flatten)]
    pub category: Category,
    pub products: Vec<Product>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Products
// ─────────────────────────────────────────────────────────────────────────────

/// A persisted product.
///
/// Image bytes are not carried here; `has_image` tells adapters whether an
/// image URL should be advertised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Price in the base currency, major units.
    pub price: f64,
    pub category_id: i64,
    pub is_saved: bool,
    pub is_featured: bool,
    pub has_image: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Binary image stored alongside a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductImage {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
    pub filename: Option<String>,
}

impl ProductImage {
    /// Content type to serve, defaulting to JPEG like the original uploads.
    pub fn content_type(&self) -> &str {
        self.mime_type.as_deref().unwrap_or("image/jpeg")
    }

    /// Filename for the `Content-Disposition` header.
    pub fn display_filename(&self, product_id: i64) -> String {
        self.filename
            .clone()
            .unwrap_or_else(|| format!("product_{product_id}.jpg"))
    }
}

/// Request to create a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category_id: i64,
    #[serde(default)]
    pub is_saved: bool,
    #[serde(default)]
    pub is_featured: bool,
}

impl NewProduct {
    /// Trim text fields and check price constraints.
    ///
    /// All failing fields are reported together.
    pub fn validate(self) -> Result<Self, CoreError> {
        let mut errors = Vec::new();
        let title = non_blank("title", &self.title, &mut errors);
        let description = non_blank("description", &self.description, &mut errors);
        check_price("price", self.price, &mut errors);

        match (title, description) {
            (Some(title), Some(description)) if errors.is_empty() => Ok(Self {
                title,
                description,
                ..self
            }),
            _ => Err(CoreError::InvalidFields(errors)),
        }
    }
}

/// Partial product update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub is_saved: Option<bool>,
    pub is_featured: Option<bool>,
    pub category_id: Option<i64>,
}

impl ProductUpdate {
    pub fn validate(self) -> Result<Self, CoreError> {
        let mut errors = Vec::new();
        let title = self
            .title
            .as_deref()
            .and_then(|t| non_blank("title", t, &mut errors));
        let description = self
            .description
            .as_deref()
            .and_then(|d| non_blank("description", d, &mut errors));
        if let Some(price) = self.price {
            check_price("price", price, &mut errors);
        }

        if errors.is_empty() {
            Ok(Self {
                title,
                description,
                ..self
            })
        } else {
            Err(CoreError::InvalidFields(errors))
        }
    }

    /// Apply the update to a product in place.
    pub fn apply(&self, product: &mut Product, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            product.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            product.description.clone_from(description);
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(is_saved) = self.is_saved {
            product.is_saved = is_saved;
        }
        if let Some(is_featured) = self.is_featured {
            product.is_featured = is_featured;
        }
        if let Some(category_id) = self.category_id {
            product.category_id = category_id;
        }
        product.updated_at = now;
    }
}

fn check_price(field: &str, price: f64, errors: &mut Vec<FieldError>) {
    if price.is_nan() || price <= 0.0 {
        errors.push(FieldError::new(field, "Price must be positive"));
    } else if !has_two_decimals(price) {
        errors.push(FieldError::new(
            field,
            "Price can have at most 2 decimal places",
        ));
    }
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    #[default]
    CreatedDesc,
}

impl ProductSort {
    /// Parse a query value; unknown values fall back to newest first.
    pub fn parse(value: &str) -> Self {
        match value {
            "price_asc" => Self::PriceAsc,
            "price_desc" => Self::PriceDesc,
            _ => Self::CreatedDesc,
        }
    }
}

/// Bounds for the featured products `limit` parameter.
pub const FEATURED_LIMIT_RANGE: std::ops::RangeInclusive<usize> = 1..=10;

/// Default number of featured products.
pub const DEFAULT_FEATURED_LIMIT: usize = 5;

/// Pick up to `limit` products for the storefront.
///
/// Products flagged as featured come first, then the most carted ones, then
/// the newest. `products` must already be ordered newest first; that order
/// breaks every tie. Each product appears at most once.
pub fn pick_featured(
    products: &[Product],
    cart_counts: &HashMap<i64, i64>,
    limit: usize,
) -> Vec<Product> {
    let mut picked: Vec<Product> = Vec::with_capacity(limit);
    let mut seen: HashSet<i64> = HashSet::new();
    let mut take = |product: &Product, picked: &mut Vec<Product>| {
        if picked.len() < limit && seen.insert(product.id) {
            picked.push(product.clone());
        }
    };

    for product in products.iter().filter(|p| p.is_featured) {
        take(product, &mut picked);
    }

    let mut popular: Vec<&Product> = products
        .iter()
        .filter(|p| cart_counts.get(&p.id).copied().unwrap_or(0) > 0)
        .collect();
    // Stable sort keeps newest-first among equal counts.
    popular.sort_by_key(|p| std::cmp::Reverse(cart_counts.get(&p.id).copied().unwrap_or(0)));
    for product in popular {
        take(product, &mut picked);
    }

    for product in products {
        take(product, &mut picked);
    }

    picked
}
