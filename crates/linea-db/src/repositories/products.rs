//! Product queries, including image storage.

use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use linea_core::{NewProduct, Product, ProductImage, ProductSort, ProductUpdate, RepositoryError};

use super::row_mappers::{PRODUCT_SELECT_COLUMNS, encode_timestamp, map_sqlx_error, row_to_product};

/// Filters for product listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category_id: Option<i64>,
    /// Only products offering this delivery option.
    pub delivery_option_id: Option<i64>,
    pub sort: ProductSort,
}

impl ProductFilter {
    pub fn in_category(category_id: i64) -> Self {
        Self {
            category_id: Some(category_id),
            ..Self::default()
        }
    }
}

/// Product access over a borrowed connection.
pub struct ProductRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProductRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&mut self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut query: QueryBuilder<'_, Sqlite> = QueryBuilder::new("SELECT ");
        query.push(PRODUCT_SELECT_COLUMNS);
        query.push(" FROM products p WHERE 1 = 1");

        if let Some(category_id) = filter.category_id {
            query.push(" AND p.category_id = ").push_bind(category_id);
        }
        if let Some(option_id) = filter.delivery_option_id {
            query
                .push(" AND EXISTS (SELECT 1 FROM product_delivery_options pdo WHERE pdo.product_id = p.id AND pdo.delivery_option_id = ")
                .push_bind(option_id)
                .push(")");
        }

        query.push(match filter.sort {
            ProductSort::PriceAsc => " ORDER BY p.price ASC, p.id ASC",
            ProductSort::PriceDesc => " ORDER BY p.price DESC, p.id ASC",
            ProductSort::CreatedDesc => " ORDER BY p.created_at DESC, p.id DESC",
        });

        let rows = query
            .build()
            .fetch_all(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_product).collect()
    }

    pub async fn get(&mut self, id: i64) -> Result<Product, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_SELECT_COLUMNS} FROM products p WHERE p.id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| RepositoryError::NotFound("Product not found".to_string()))?;

        row_to_product(&row)
    }

    pub async fn exists(&mut self, id: i64) -> Result<bool, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?;
        Ok(count > 0)
    }

    /// Insert a validated product.
    ///
    /// Fails with `Constraint` if the category does not exist.
    pub async fn create(&mut self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let now = encode_timestamp(Utc::now());
        let result = sqlx::query(
            "INSERT INTO products (title, description, price, category_id, is_saved, is_featured, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.category_id)
        .bind(new.is_saved)
        .bind(new.is_featured)
        .bind(&now)
        .bind(&now)
        .execute(&mut *self.conn)
        .await
        .map_err(map_sqlx_error)?;

        let id = result.last_insert_rowid();
        tracing::debug!(product_id = id, category_id = new.category_id, "Product created");
        self.get(id).await
    }

    /// Apply a validated partial update and return the stored product.
    pub async fn update(
        &mut self,
        id: i64,
        update: &ProductUpdate,
    ) -> Result<Product, RepositoryError> {
        let mut product = self.get(id).await?;
        update.apply(&mut product, Utc::now());

        sqlx::query(
            "UPDATE products SET title = ?, description = ?, price = ?, category_id = ?, is_saved = ?, is_featured = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.category_id)
        .bind(product.is_saved)
        .bind(product.is_featured)
        .bind(encode_timestamp(product.updated_at))
        .bind(id)
        .execute(&mut *self.conn)
        .await
        .map_err(map_sqlx_error)?;

        self.get(id).await
    }

    /// Delete a product; cart entries and delivery links cascade.
    pub async fn delete(&mut self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("Product not found".to_string()));
        }
        tracing::debug!(product_id = id, "Product deleted");
        Ok(())
    }

    /// Stored image for a product.
    ///
    /// `Ok(None)` means the product exists but has no image.
    pub async fn image(&mut self, id: i64) -> Result<Option<ProductImage>, RepositoryError> {
        let row = sqlx::query(
            "SELECT image_data, image_mime_type, image_filename FROM products WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| RepositoryError::NotFound("Product not found".to_string()))?;

        let data: Option<Vec<u8>> = row
            .try_get("image_data")
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        let Some(data) = data else {
            return Ok(None);
        };

        Ok(Some(ProductImage {
            data,
            mime_type: row
                .try_get("image_mime_type")
                .map_err(|e| RepositoryError::Storage(e.to_string()))?,
            filename: row
                .try_get("image_filename")
                .map_err(|e| RepositoryError::Storage(e.to_string()))?,
        }))
    }

    pub async fn set_image(&mut self, id: i64, image: &ProductImage) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET image_data = ?, image_mime_type = ?, image_filename = ? WHERE id = ?",
        )
        .bind(&image.data)
        .bind(&image.mime_type)
        .bind(&image.filename)
        .bind(id)
        .execute(&mut *self.conn)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound("Product not found".to_string()));
        }
        Ok(())
    }
}
