#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod repositories;
pub mod seed;
pub mod session;
pub mod setup;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Linked for the bundled SQLite build only.
use libsqlite3_sys as _;

pub use repositories::{
    CartRepository, CategoryRepository, DeliveryOptionRepository, ExchangeRateRepository,
    ProductFilter, ProductRepository,
};
pub use seed::{SeedError, SeedReport, seed_database};
pub use session::{DbSession, DbTransaction, PoolSessionProvider, SessionProvider};
pub use setup::{create_schema, setup_database};
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;

#[cfg(any(test, feature = "test-utils"))]
pub use testing::{LifecycleState, TestDb, TestDbError, TestDbSessionProvider, TestSession};
