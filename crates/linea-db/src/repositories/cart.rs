//! Cart entry queries.
//!
//! A cart entry records that one shopper session holds a product. Adding
//! twice from the same session is a no-op.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqliteConnection;

use linea_core::{CartCount, RepositoryError};

use super::row_mappers::{encode_timestamp, map_sqlx_error};

/// Cart access over a borrowed connection.
pub struct CartRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CartRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Record `session_id` as holding the product; idempotent per session.
    pub async fn add(
        &mut self,
        product_id: i64,
        session_id: &str,
    ) -> Result<CartCount, RepositoryError> {
        sqlx::query(
            "INSERT INTO cart_entries (product_id, session_id, created_at) VALUES (?, ?, ?)
             ON CONFLICT (product_id, session_id) DO NOTHING",
        )
        .bind(product_id)
        .bind(session_id)
        .bind(encode_timestamp(Utc::now()))
        .execute(&mut *self.conn)
        .await
        .map_err(map_sqlx_error)?;

        self.count(product_id).await
    }

    /// Forget `session_id` for the product; removing a missing entry is fine.
    pub async fn remove(
        &mut self,
        product_id: i64,
        session_id: &str,
    ) -> Result<CartCount, RepositoryError> {
        sqlx::query("DELETE FROM cart_entries WHERE product_id = ? AND session_id = ?")
            .bind(product_id)
            .bind(session_id)
            .execute(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?;

        self.count(product_id).await
    }

    pub async fn count(&mut self, product_id: i64) -> Result<CartCount, RepositoryError> {
        let (cart_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(DISTINCT session_id) FROM cart_entries WHERE product_id = ?",
        )
        .bind(product_id)
        .fetch_one(&mut *self.conn)
        .await
        .map_err(map_sqlx_error)?;

        Ok(CartCount {
            product_id,
            cart_count,
        })
    }

    /// Counts for every product with at least one entry.
    pub async fn counts(&mut self) -> Result<HashMap<i64, i64>, RepositoryError> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT product_id, COUNT(DISTINCT session_id) FROM cart_entries GROUP BY product_id",
        )
        .fetch_all(&mut *self.conn)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().collect())
    }
}
