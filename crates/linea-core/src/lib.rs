#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod fx;
pub mod money;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    CartCount, CartEntryRequest, Category, CategoryWithProducts, DEFAULT_FEATURED_LIMIT,
    DeliveryOption, DeliverySpeed, DeliverySummary, FEATURED_LIMIT_RANGE, FieldError, NewCategory,
    NewProduct, Product, ProductImage, ProductSort, ProductUpdate, pick_featured, sort_for_display,
};
pub use fx::{ExchangeRate, FxMetadata, RateTable};
pub use money::{Currency, CurrencyInfo, Money, PriceInfo};
pub use ports::{
    CoreError, DisabledRateProvider, RateProvider, RateProviderError, RepositoryError,
    StaticRateProvider,
};
pub use settings::CurrencySettings;

// Silence unused dev-dependency warnings; used by integration-style unit tests
#[cfg(test)]
use serde_json as _;
#[cfg(test)]
use tokio as _;
#[cfg(test)]
use tokio_test as _;
