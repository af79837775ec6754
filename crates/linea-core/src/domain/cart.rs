//! Cart count types.
//!
//! The store tracks how many distinct shopper sessions have a product in
//! their cart, not quantities.

use serde::{Deserialize, Serialize};

/// Body of `POST /cart/add` and `POST /cart/remove`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartEntryRequest {
    pub product_id: i64,
    /// Opaque shopper session identifier supplied by the frontend.
    pub session_id: String,
}

/// Number of shopper sessions holding a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCount {
    pub product_id: i64,
    pub cart_count: i64,
}
