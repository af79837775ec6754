//! Core domain types.
//!
//! These types represent the pure domain model, independent of any
//! infrastructure concerns (database, HTTP, etc.).
//!
//! # Structure
//!
//! - `catalog` - Categories and products (`Category`, `Product`, `NewProduct`)
//! - `delivery` - Delivery options and per-product delivery summaries
//! - `cart` - Cart count requests and responses

mod cart;
mod catalog;
mod delivery;

use serde::{Deserialize, Serialize};

pub use cart::{CartCount, CartEntryRequest};
pub use catalog::{
    Category, CategoryWithProducts, DEFAULT_FEATURED_LIMIT, FEATURED_LIMIT_RANGE, NewCategory,
    NewProduct, Product, ProductImage, ProductSort, ProductUpdate, pick_featured,
};
pub use delivery::{DeliveryOption, DeliverySpeed, DeliverySummary, sort_for_display};

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub error: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            error: error.into(),
        }
    }
}

/// Trim a text field and reject it if nothing is left.
pub(crate) fn non_blank(
    field: &str,
    value: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new(field, "Field cannot be empty or whitespace"));
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Whether an amount has at most two decimal places.
#[allow(clippy::float_cmp)]
pub(crate) fn has_two_decimals(value: f64) -> bool {
    // Rounding to cents and back yields the same double for well-formed prices.
    (value * 100.0).round() / 100.0 == value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank_trims() {
        let mut errors = Vec::new();
        assert_eq!(
            non_blank("name", "  Shoes ", &mut errors),
            Some("Shoes".to_string())
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_non_blank_rejects_whitespace() {
        let mut errors = Vec::new();
        assert_eq!(non_blank("name", "   ", &mut errors), None);
        assert_eq!(errors[0].field, "name");
    }

    #[test]
    fn test_has_two_decimals() {
        assert!(has_two_decimals(29.99));
        assert!(has_two_decimals(10.0));
        assert!(has_two_decimals(0.1));
        assert!(!has_two_decimals(1.999));
        assert!(!has_two_decimals(0.001));
    }
}
