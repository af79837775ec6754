//! Category queries.

use chrono::Utc;
use sqlx::SqliteConnection;

use linea_core::{Category, NewCategory, RepositoryError};

use super::row_mappers::{encode_timestamp, map_sqlx_error, row_to_category};

const CATEGORY_SELECT: &str = "SELECT c.id, c.name, c.created_at, c.updated_at FROM categories c";

/// Category access over a borrowed connection.
pub struct CategoryRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CategoryRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// All categories ordered by name.
    pub async fn list(&mut self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query(&format!("{CATEGORY_SELECT} ORDER BY c.name"))
            .fetch_all(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_category).collect()
    }

    /// Categories that have at least one product, ordered by name.
    pub async fn list_non_empty(&mut self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{CATEGORY_SELECT} WHERE EXISTS (SELECT 1 FROM products p WHERE p.category_id = c.id) ORDER BY c.name"
        ))
        .fetch_all(&mut *self.conn)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_category).collect()
    }

    pub async fn get(&mut self, id: i64) -> Result<Category, RepositoryError> {
        let row = sqlx::query(&format!("{CATEGORY_SELECT} WHERE c.id = ?"))
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?
            .ok_or_else(|| RepositoryError::NotFound("Category not found".to_string()))?;

        row_to_category(&row)
    }

    pub async fn exists(&mut self, id: i64) -> Result<bool, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?;
        Ok(count > 0)
    }

    pub async fn find_by_name(&mut self, name: &str) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query(&format!("{CATEGORY_SELECT} WHERE c.name = ?"))
            .bind(name)
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_category).transpose()
    }

    /// Insert a category. Names are unique.
    pub async fn create(&mut self, new: &NewCategory) -> Result<Category, RepositoryError> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO categories (name, created_at, updated_at) VALUES (?, ?, ?)",
        )
        .bind(&new.name)
        .bind(encode_timestamp(now))
        .bind(encode_timestamp(now))
        .execute(&mut *self.conn)
        .await
        .map_err(|e| match map_sqlx_error(e) {
            RepositoryError::AlreadyExists(_) => RepositoryError::AlreadyExists(format!(
                "Category with name '{}' already exists",
                new.name
            )),
            other => other,
        })?;

        let id = result.last_insert_rowid();
        tracing::debug!(category_id = id, name = %new.name, "Category created");
        self.get(id).await
    }
}

#[cfg(test)]
mod tests {
    use crate::session::DbSession;
    use crate::setup::setup_test_database;
    use linea_core::{NewCategory, RepositoryError};

    #[tokio::test]
    async fn test_create_and_list_sorted() {
        let pool = setup_test_database().await.unwrap();
        let mut session = DbSession::open(&pool).await.unwrap();
        let mut repo = session.categories();

        repo.create(&NewCategory::new("Toys")).await.unwrap();
        let books = repo.create(&NewCategory::new("Books")).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Books", "Toys"]);
        assert_eq!(repo.get(books.id).await.unwrap().name, "Books");
        assert!(repo.exists(books.id).await.unwrap());
        assert!(!repo.exists(999).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let pool = setup_test_database().await.unwrap();
        let mut session = DbSession::open(&pool).await.unwrap();
        let mut repo = session.categories();

        repo.create(&NewCategory::new("Toys")).await.unwrap();
        let err = repo.create(&NewCategory::new("Toys")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyExists(msg) if msg.contains("Toys")));
    }

    #[tokio::test]
    async fn test_missing_category_not_found() {
        let pool = setup_test_database().await.unwrap();
        let mut session = DbSession::open(&pool).await.unwrap();
        let err = session.categories().get(42).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
        assert!(session.categories().find_by_name("none").await.unwrap().is_none());
    }
}
