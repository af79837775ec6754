//! Scoped units of work.
//!
//! A `DbSession` owns one pooled connection for its lifetime and returns it
//! to the pool on drop, whether the owner returned normally, bailed out with
//! `?`, or unwound from a panic. Sessions are never cloned; repositories
//! borrow the connection mutably for the duration of a call chain.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{Connection, Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::fmt;

use linea_core::RepositoryError;

use crate::repositories::{
    CartRepository, CategoryRepository, DeliveryOptionRepository, ExchangeRateRepository,
    ProductRepository, map_sqlx_error,
};

/// One pooled connection, released on drop.
pub struct DbSession {
    conn: PoolConnection<Sqlite>,
}

impl fmt::Debug for DbSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbSession").finish_non_exhaustive()
    }
}

impl DbSession {
    /// Check a connection out of `pool`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if the pool is closed or the
    /// acquire times out.
    pub async fn open(pool: &SqlitePool) -> Result<Self, RepositoryError> {
        let conn = pool.acquire().await.map_err(map_sqlx_error)?;
        Ok(Self { conn })
    }

    /// Raw connection for ad-hoc queries.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Start a transaction on this session's connection.
    ///
    /// The transaction rolls back when dropped without `commit()`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if `BEGIN` fails.
    pub async fn begin(&mut self) -> Result<DbTransaction<'_>, RepositoryError> {
        let tx = Connection::begin(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?;
        Ok(DbTransaction { tx })
    }

    pub fn categories(&mut self) -> CategoryRepository<'_> {
        CategoryRepository::new(&mut self.conn)
    }

    pub fn products(&mut self) -> ProductRepository<'_> {
        ProductRepository::new(&mut self.conn)
    }

    pub fn delivery_options(&mut self) -> DeliveryOptionRepository<'_> {
        DeliveryOptionRepository::new(&mut self.conn)
    }

    pub fn cart(&mut self) -> CartRepository<'_> {
        CartRepository::new(&mut self.conn)
    }

    pub fn exchange_rates(&mut self) -> ExchangeRateRepository<'_> {
        ExchangeRateRepository::new(&mut self.conn)
    }
}

/// A transaction borrowed from a `DbSession`.
pub struct DbTransaction<'s> {
    tx: Transaction<'s, Sqlite>,
}

impl DbTransaction<'_> {
    /// Commit all writes made through this transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if `COMMIT` fails.
    pub async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    /// Discard all writes. Dropping the transaction has the same effect.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Storage` if `ROLLBACK` fails.
    pub async fn rollback(self) -> Result<(), RepositoryError> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }

    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub fn categories(&mut self) -> CategoryRepository<'_> {
        CategoryRepository::new(&mut self.tx)
    }

    pub fn products(&mut self) -> ProductRepository<'_> {
        ProductRepository::new(&mut self.tx)
    }

    pub fn delivery_options(&mut self) -> DeliveryOptionRepository<'_> {
        DeliveryOptionRepository::new(&mut self.tx)
    }

    pub fn cart(&mut self) -> CartRepository<'_> {
        CartRepository::new(&mut self.tx)
    }

    pub fn exchange_rates(&mut self) -> ExchangeRateRepository<'_> {
        ExchangeRateRepository::new(&mut self.tx)
    }
}

/// Source of sessions for request handlers.
///
/// The HTTP layer resolves this once per request; tests swap in a provider
/// bound to their own database.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Open a fresh session.
    async fn open(&self) -> Result<DbSession, RepositoryError>;
}

/// Production provider backed by the application pool.
#[derive(Debug, Clone)]
pub struct PoolSessionProvider {
    pool: SqlitePool,
}

impl PoolSessionProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SessionProvider for PoolSessionProvider {
    fn name(&self) -> &str {
        "pool"
    }

    async fn open(&self) -> Result<DbSession, RepositoryError> {
        DbSession::open(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;
    use linea_core::NewCategory;

    #[tokio::test]
    async fn test_uncommitted_transaction_rolls_back() {
        let pool = setup_test_database().await.unwrap();
        let mut session = DbSession::open(&pool).await.unwrap();

        {
            let mut tx = session.begin().await.unwrap();
            tx.categories()
                .create(&NewCategory::new("Garden"))
                .await
                .unwrap();
        }

        assert!(session.categories().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_committed_transaction_visible_to_other_sessions() {
        let pool = setup_test_database().await.unwrap();
        let mut writer = DbSession::open(&pool).await.unwrap();

        let mut tx = writer.begin().await.unwrap();
        tx.categories()
            .create(&NewCategory::new("Garden"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let provider = PoolSessionProvider::new(pool);
        let mut reader = provider.open().await.unwrap();
        let names: Vec<String> = reader
            .categories()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Garden".to_string()]);
    }
}
