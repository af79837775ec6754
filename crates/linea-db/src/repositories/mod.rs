//! Repository implementations using `SQLite`.
//!
//! Each repository borrows a connection from a `DbSession` or
//! `DbTransaction`, so the same queries run inside or outside a transaction.
//! Rows are mapped to `linea-core` types; sqlx errors never leave this module.

mod cart;
mod categories;
mod delivery_options;
mod exchange_rates;
mod products;
mod row_mappers;

pub use cart::CartRepository;
pub use categories::CategoryRepository;
pub use delivery_options::DeliveryOptionRepository;
pub use exchange_rates::ExchangeRateRepository;
pub use products::{ProductFilter, ProductRepository};

pub(crate) use row_mappers::{encode_timestamp, map_sqlx_error};
