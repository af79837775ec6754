#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Silence unused dev-dependency warnings; used by integration tests
#[cfg(test)]
use http_body_util as _;

// Used by the main.rs binary
use clap as _;
use dotenvy as _;
use tracing_subscriber as _;

pub mod app;
pub mod bootstrap;
pub mod currency;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod overrides;
pub mod rate_client;
pub mod routes;
pub mod state;
pub mod testing;

// Re-export primary types
pub use app::App;
pub use bootstrap::{CorsConfig, ServerConfig, bootstrap, seed, start_server};
pub use currency::{Conversion, ConvertedPrice, CurrencyService};
pub use error::{HttpError, ProblemDetails};
pub use overrides::{DependencyKey, DependencyOverrides};
pub use rate_client::ExchangeRateHostProvider;
pub use routes::create_router;
pub use state::{AppContext, AppState};
pub use testing::{TestClient, TestResponse};
