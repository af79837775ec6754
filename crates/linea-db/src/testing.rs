//! Ephemeral, seeded databases for tests.
//!
//! A `TestDb` lives in a temp file for the duration of a test session:
//!
//! ```text
//! Uninitialized -> SchemaReady -> Seeded -> Serving -> Disposed
//! ```
//!
//! Setup failures tear down whatever was created before the error is
//! returned. Teardown closes the pool, then the file descriptor, then
//! removes the file.
//!
//! ```rust,ignore
//! let db = TestDb::create().await?;
//! let mut session = db.session().await?;
//! let products = session.products().list(&ProductFilter::default()).await?;
//! drop(session);
//! db.teardown().await?;
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::OnceCell;

use linea_core::RepositoryError;

use crate::seed::{SeedError, seed_database};
use crate::session::{DbSession, SessionProvider};
use crate::setup::create_schema;

/// Connections kept by a test pool; enough for a handful of concurrent sessions.
const TEST_POOL_MAX_CONNECTIONS: u32 = 5;

/// Where a test database is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Uninitialized,
    SchemaReady,
    Seeded,
    Serving,
    Disposed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::SchemaReady => "schema ready",
            Self::Seeded => "seeded",
            Self::Serving => "serving",
            Self::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// Errors from creating or destroying a test database.
#[derive(Debug, Error)]
pub enum TestDbError {
    /// The temp file or pool could not be created.
    #[error("Failed to open test database: {0}")]
    Open(String),

    /// Schema creation or seeding failed. Storage was already torn down.
    #[error("Test database setup failed after reaching '{reached}': {message}")]
    Setup {
        reached: LifecycleState,
        message: String,
    },

    /// Removing the temp file failed.
    #[error("Failed to remove test database file: {0}")]
    Teardown(#[source] std::io::Error),
}

impl From<SeedError> for TestDbError {
    fn from(err: SeedError) -> Self {
        Self::Setup {
            reached: LifecycleState::SchemaReady,
            message: err.to_string(),
        }
    }
}

/// A seeded database in a throwaway file.
///
/// Field order matters: the pool drops before the temp file, so a `TestDb`
/// dropped without `teardown()` still releases connections before the file
/// is removed.
pub struct TestDb {
    pool: SqlitePool,
    file: Option<NamedTempFile>,
    state: LifecycleState,
}

impl fmt::Debug for TestDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDb")
            .field("path", &self.file.as_ref().map(NamedTempFile::path))
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl TestDb {
    /// Create a temp file, apply the schema and seed it.
    ///
    /// # Errors
    ///
    /// Returns `TestDbError::Open` if the file or pool cannot be created and
    /// `TestDbError::Setup` if schema or seeding fails. In both cases no file
    /// is left behind.
    pub async fn create() -> Result<Self, TestDbError> {
        Self::create_with(|pool| async move { seed_database(&pool).await.map(|_| ()) }).await
    }

    /// Like [`TestDb::create`], with `seed` run after the schema is applied.
    ///
    /// A failing `seed` tears the storage down and surfaces as
    /// `TestDbError::Setup` with `reached: SchemaReady`.
    ///
    /// # Errors
    ///
    /// Same as [`TestDb::create`].
    pub async fn create_with<F, Fut>(seed: F) -> Result<Self, TestDbError>
    where
        F: FnOnce(SqlitePool) -> Fut,
        Fut: Future<Output = Result<(), SeedError>>,
    {
        let file = tempfile::Builder::new()
            .prefix("linea-test-")
            .suffix(".db")
            .tempfile()
            .map_err(|e| TestDbError::Open(e.to_string()))?;

        // No background reaping: the pool may be shared across test runtimes.
        let pool = SqlitePoolOptions::new()
            .max_connections(TEST_POOL_MAX_CONNECTIONS)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(file.path())
                    .create_if_missing(false),
            )
            .await
            .map_err(|e| TestDbError::Open(e.to_string()))?;

        let mut db = Self {
            pool,
            file: Some(file),
            state: LifecycleState::Uninitialized,
        };

        if let Err(err) = db.initialize(seed).await {
            if let Err(teardown_err) = db.dispose().await {
                tracing::warn!(error = %teardown_err, "Teardown after failed setup also failed");
            }
            return Err(err);
        }

        db.state = LifecycleState::Serving;
        tracing::debug!(path = ?db.path(), "Test database ready");
        Ok(db)
    }

    async fn initialize<F, Fut>(&mut self, seed: F) -> Result<(), TestDbError>
    where
        F: FnOnce(SqlitePool) -> Fut,
        Fut: Future<Output = Result<(), SeedError>>,
    {
        create_schema(&self.pool)
            .await
            .map_err(|e| TestDbError::Setup {
                reached: self.state,
                message: e.to_string(),
            })?;
        self.state = LifecycleState::SchemaReady;

        seed(self.pool.clone()).await?;
        self.state = LifecycleState::Seeded;
        Ok(())
    }

    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Location of the backing file while it exists.
    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(NamedTempFile::path)
    }

    /// The underlying pool, for code that needs raw access.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a session bound to this database.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if the pool is closed.
    pub async fn session(&self) -> Result<DbSession, RepositoryError> {
        DbSession::open(&self.pool).await
    }

    /// Session provider that opens a fresh session per call against this database.
    pub fn session_provider(&self) -> Arc<dyn SessionProvider> {
        Arc::new(TestDbSessionProvider {
            pool: self.pool.clone(),
        })
    }

    /// Connections currently checked out of the pool.
    pub fn checked_out(&self) -> usize {
        (self.pool.size() as usize).saturating_sub(self.pool.num_idle())
    }

    /// Wait until every session has been returned to the pool.
    ///
    /// Dropped connections are handed back asynchronously, so a check right
    /// after a drop can still see them as checked out.
    pub async fn wait_until_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.checked_out() == 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Close the pool, then the file descriptor, then delete the file.
    ///
    /// Waits for outstanding sessions to be returned before closing.
    ///
    /// # Errors
    ///
    /// Returns `TestDbError::Teardown` if the file cannot be removed.
    pub async fn teardown(mut self) -> Result<(), TestDbError> {
        self.dispose().await
    }

    async fn dispose(&mut self) -> Result<(), TestDbError> {
        self.pool.close().await;

        let result = match self.file.take() {
            Some(file) => {
                let (descriptor, path) = file.into_parts();
                drop(descriptor);
                path.close().map_err(TestDbError::Teardown)
            }
            None => Ok(()),
        };

        self.state = LifecycleState::Disposed;
        tracing::debug!("Test database disposed");
        result
    }
}

impl Drop for TestDb {
    fn drop(&mut self) {
        if self.state != LifecycleState::Disposed {
            tracing::debug!(
                state = %self.state,
                "Test database dropped without teardown; file removed on drop, pool not closed"
            );
        }
    }
}

/// Provider handed to the HTTP layer in tests.
#[derive(Debug, Clone)]
pub struct TestDbSessionProvider {
    pool: SqlitePool,
}

#[async_trait]
impl SessionProvider for TestDbSessionProvider {
    fn name(&self) -> &str {
        "test-db"
    }

    async fn open(&self) -> Result<DbSession, RepositoryError> {
        DbSession::open(&self.pool).await
    }
}

/// One database shared by every test in a session.
///
/// The database is created on first use; later calls get the same instance
/// without re-running schema or seeding.
#[derive(Debug, Default)]
pub struct TestSession {
    db: OnceCell<TestDb>,
    initializations: AtomicUsize,
}

impl TestSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared database, created on first call.
    ///
    /// # Errors
    ///
    /// Returns the setup error if creation fails; a later call retries.
    pub async fn db(&self) -> Result<&TestDb, TestDbError> {
        self.db
            .get_or_try_init(|| async {
                self.initializations.fetch_add(1, Ordering::SeqCst);
                TestDb::create().await
            })
            .await
    }

    /// How many times the database has been created.
    pub fn initializations(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }

    /// Tear down the shared database if it was ever created.
    ///
    /// # Errors
    ///
    /// Returns `TestDbError::Teardown` if the file cannot be removed.
    pub async fn finish(self) -> Result<(), TestDbError> {
        match self.db.into_inner() {
            Some(db) => db.teardown().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::ProductFilter;

    #[tokio::test]
    async fn test_create_reaches_serving() {
        let db = TestDb::create().await.unwrap();
        assert_eq!(db.state(), LifecycleState::Serving);
        assert!(db.path().unwrap().exists());
        tokio_test::assert_ok!(db.teardown().await);
    }

    #[tokio::test]
    async fn test_failed_seed_reports_schema_ready() {
        let result = TestDb::create_with(|_pool| async {
            Err(SeedError::MissingReference {
                kind: "category",
                name: "nowhere".to_string(),
            })
        })
        .await;

        let err = tokio_test::assert_err!(result);
        assert!(matches!(
            err,
            TestDbError::Setup {
                reached: LifecycleState::SchemaReady,
                ..
            }
        ));
        assert!(err.to_string().contains("unknown category 'nowhere'"));
    }

    #[tokio::test]
    async fn test_session_sees_seed_data() {
        let db = TestDb::create().await.unwrap();
        {
            let mut session = db.session().await.unwrap();
            let products = session.products().list(&ProductFilter::default()).await.unwrap();
            assert_eq!(products.len(), 12);
        }
        assert!(db.wait_until_idle(Duration::from_secs(2)).await);
        db.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn test_teardown_removes_file() {
        let db = TestDb::create().await.unwrap();
        let path = db.path().unwrap().to_path_buf();
        db.teardown().await.unwrap();

        assert!(!path.exists());
        let err = std::fs::File::open(&path).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_drop_without_teardown_removes_file() {
        let db = TestDb::create().await.unwrap();
        let path = db.path().unwrap().to_path_buf();
        drop(db);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_lifecycle_states_are_ordered() {
        assert!(LifecycleState::Uninitialized < LifecycleState::SchemaReady);
        assert!(LifecycleState::Seeded < LifecycleState::Serving);
        assert!(LifecycleState::Serving < LifecycleState::Disposed);
        assert_eq!(LifecycleState::SchemaReady.to_string(), "schema ready");
    }

    #[tokio::test]
    async fn test_session_db_created_once() {
        let session = TestSession::new();
        let first: *const TestDb = session.db().await.unwrap();
        let second: *const TestDb = session.db().await.unwrap();

        assert!(std::ptr::eq(first, second));
        assert_eq!(session.initializations(), 1);
        session.finish().await.unwrap();
    }

    #[tokio::test]
    async fn test_finish_without_db_is_noop() {
        tokio_test::assert_ok!(TestSession::new().finish().await);
    }
}
