//! Shared helpers for linea-db integration tests.

use std::time::Duration;

use linea_db::TestDb;

/// How long dropped sessions get to find their way back to the pool.
pub const RELEASE_TIMEOUT: Duration = Duration::from_secs(2);

/// Fresh seeded database; panics if setup fails.
pub async fn seeded_db() -> TestDb {
    TestDb::create()
        .await
        .expect("test database setup should succeed")
}

/// Assert that no session opened against `db` is still checked out.
pub async fn assert_all_sessions_released(db: &TestDb) {
    assert!(
        db.wait_until_idle(RELEASE_TIMEOUT).await,
        "{} session(s) still checked out",
        db.checked_out()
    );
}
