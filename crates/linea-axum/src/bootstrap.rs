//! Axum server bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the HTTP server. All concrete implementations are instantiated here.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use linea_core::CurrencySettings;
use linea_db::{PoolSessionProvider, seed_database, setup_database};

use crate::app::App;
use crate::currency::CurrencyService;
use crate::rate_client::{
    DEFAULT_EXCHANGE_API_TIMEOUT, DEFAULT_EXCHANGE_API_URL, ExchangeRateHostProvider,
};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8001;

/// Default SQLite file, relative to the working directory.
pub const DEFAULT_DATABASE_PATH: &str = "store.db";

/// Origins of the storefront frontend in development.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:3001", "http://127.0.0.1:3001"];

/// CORS configuration for the web server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsConfig {
    /// Allow all origins, without credentials.
    AllowAll,
    /// Allow specific origins, with credentials.
    AllowOrigins(Vec<String>),
}

impl CorsConfig {
    /// The storefront's development origins.
    pub fn default_origins() -> Self {
        Self::AllowOrigins(
            DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(ToString::to_string)
                .collect(),
        )
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the HTTP server.
    pub port: u16,
    /// SQLite database file.
    pub database_path: PathBuf,
    /// CORS configuration.
    pub cors: CorsConfig,
    /// Base and supported currencies, rate TTL.
    pub currency: CurrencySettings,
    /// Endpoint for latest exchange rates.
    pub exchange_api_url: String,
    /// Timeout for exchange rate requests.
    pub exchange_api_timeout: Duration,
    /// Seed demo data before serving.
    pub seed_on_start: bool,
}

impl ServerConfig {
    /// Create config with default values.
    pub fn with_defaults() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            cors: CorsConfig::default_origins(),
            currency: CurrencySettings::with_defaults(),
            exchange_api_url: DEFAULT_EXCHANGE_API_URL.to_string(),
            exchange_api_timeout: DEFAULT_EXCHANGE_API_TIMEOUT,
            seed_on_start: false,
        }
    }

    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`.
    ///
    /// Reads `PORT`, `DATABASE_PATH`, `CORS_ORIGINS` (comma separated, `*`
    /// for any), `EXCHANGE_API_URL`, `EXCHANGE_API_TIMEOUT_SECONDS` and the
    /// currency variables. Unparseable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::with_defaults();
        config.currency = CurrencySettings::from_lookup(&lookup);

        if let Some(port) = lookup("PORT").and_then(|v| v.trim().parse().ok()) {
            config.port = port;
        }
        if let Some(path) = lookup("DATABASE_PATH").filter(|v| !v.trim().is_empty()) {
            config.database_path = PathBuf::from(path);
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            config.cors = parse_cors(&origins);
        }
        if let Some(url) = lookup("EXCHANGE_API_URL").filter(|v| !v.trim().is_empty()) {
            config.exchange_api_url = url;
        }
        if let Some(secs) = lookup("EXCHANGE_API_TIMEOUT_SECONDS").and_then(|v| v.trim().parse().ok())
        {
            config.exchange_api_timeout = Duration::from_secs(secs);
        }
        config
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Set CORS to allow specific origins.
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsConfig::AllowOrigins(origins);
        self
    }

    #[must_use]
    pub const fn with_seed_on_start(mut self, seed: bool) -> Self {
        self.seed_on_start = seed;
        self
    }
}

fn parse_cors(raw: &str) -> CorsConfig {
    if raw.trim() == "*" {
        return CorsConfig::AllowAll;
    }
    CorsConfig::AllowOrigins(
        raw.split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(ToString::to_string)
            .collect(),
    )
}

/// Open the database and wire up the application.
pub async fn bootstrap(config: &ServerConfig) -> Result<App> {
    tracing::info!(
        database_path = %config.database_path.display(),
        base_currency = %config.currency.base_currency,
        exchange_api_url = %config.exchange_api_url,
        "Bootstrapping Linea API"
    );

    let pool = setup_database(&config.database_path).await?;
    if config.seed_on_start {
        let report = seed_database(&pool).await?;
        tracing::info!(?report, "Seeded database on start");
    }

    let provider =
        ExchangeRateHostProvider::new(config.exchange_api_url.clone(), config.exchange_api_timeout)?;
    let currency = CurrencyService::new(config.currency.clone(), Arc::new(provider));

    Ok(App::new(
        Arc::new(PoolSessionProvider::new(pool)),
        currency,
        config.cors.clone(),
    ))
}

/// Seed the configured database and report what was inserted.
pub async fn seed(config: &ServerConfig) -> Result<linea_db::SeedReport> {
    let pool = setup_database(&config.database_path).await?;
    let report = seed_database(&pool).await?;
    pool.close().await;
    Ok(report)
}

/// Bootstrap and serve until Ctrl-C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    use tokio::net::TcpListener;
    use tracing::info;

    let app = bootstrap(&config).await?;
    app.startup();

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Linea API listening on http://{}", addr);

    let served = axum::serve(listener, app.router())
        .with_graceful_shutdown(shutdown_signal())
        .await;
    app.shutdown();
    served?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
