//! HTTP request handlers for the Axum web server.
//!
//! Each submodule contains handlers for a specific API area. Handlers open
//! one session per request through the `Db` extractor and release it when
//! they return.

pub mod cart;
pub mod categories;
pub mod checkout;
pub mod currencies;
pub mod delivery;
pub mod health;
pub mod products;
