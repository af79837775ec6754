//! Shared helpers for linea-axum integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use linea_axum::{App, CorsConfig, CurrencyService, TestClient};
use linea_core::{CurrencySettings, DisabledRateProvider, RateProvider};
use linea_db::{PoolSessionProvider, TestDb, setup_test_database};

/// How long dropped sessions get to find their way back to the pool.
pub const RELEASE_TIMEOUT: Duration = Duration::from_secs(2);

/// Fresh seeded database; panics if setup fails.
pub async fn seeded_db() -> TestDb {
    TestDb::create()
        .await
        .expect("test database setup should succeed")
}

/// App whose production provider points at an empty in-memory database.
///
/// Requests only see seeded rows once a test provider is installed.
pub async fn test_app() -> App {
    test_app_with_provider(Arc::new(DisabledRateProvider)).await
}

pub async fn test_app_with_provider(provider: Arc<dyn RateProvider>) -> App {
    let pool = setup_test_database()
        .await
        .expect("in-memory database should open");
    App::new(
        Arc::new(PoolSessionProvider::new(pool)),
        CurrencyService::new(CurrencySettings::with_defaults(), provider),
        CorsConfig::default_origins(),
    )
}

/// Client for `app` bound to `db`.
pub fn client(app: &App, db: &TestDb) -> TestClient {
    TestClient::new(app, db.session_provider())
}

/// Assert that no session opened against `db` is still checked out.
pub async fn assert_all_sessions_released(db: &TestDb) {
    assert!(
        db.wait_until_idle(RELEASE_TIMEOUT).await,
        "{} session(s) still checked out",
        db.checked_out()
    );
}
