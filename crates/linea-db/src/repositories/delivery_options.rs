//! Delivery option queries.

use std::collections::HashMap;

use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use linea_core::{DeliveryOption, RepositoryError};

use super::row_mappers::{
    DELIVERY_OPTION_SELECT_COLUMNS, map_sqlx_error, row_to_delivery_option,
};

/// Delivery option access over a borrowed connection.
pub struct DeliveryOptionRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> DeliveryOptionRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Active options, fastest first, then cheapest.
    pub async fn list_active(&mut self) -> Result<Vec<DeliveryOption>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {DELIVERY_OPTION_SELECT_COLUMNS} FROM delivery_options d
             WHERE d.is_active = 1
             ORDER BY d.estimated_days_min ASC, d.price ASC"
        ))
        .fetch_all(&mut *self.conn)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_delivery_option).collect()
    }

    pub async fn find_by_name(
        &mut self,
        name: &str,
    ) -> Result<Option<DeliveryOption>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {DELIVERY_OPTION_SELECT_COLUMNS} FROM delivery_options d WHERE d.name = ?"
        ))
        .bind(name)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_delivery_option).transpose()
    }

    /// Every option linked to a product, active or not.
    pub async fn for_product(
        &mut self,
        product_id: i64,
    ) -> Result<Vec<DeliveryOption>, RepositoryError> {
        let mut by_product = self.for_products(&[product_id]).await?;
        Ok(by_product.remove(&product_id).unwrap_or_default())
    }

    /// Linked options for many products in one query, keyed by product id.
    ///
    /// Products without links are absent from the map.
    pub async fn for_products(
        &mut self,
        product_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<DeliveryOption>>, RepositoryError> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query: QueryBuilder<'_, Sqlite> = QueryBuilder::new("SELECT pdo.product_id, ");
        query.push(DELIVERY_OPTION_SELECT_COLUMNS);
        query.push(
            " FROM product_delivery_options pdo
              JOIN delivery_options d ON d.id = pdo.delivery_option_id
              WHERE pdo.product_id IN (",
        );
        let mut ids = query.separated(", ");
        for id in product_ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(") ORDER BY pdo.product_id, d.id");

        let rows = query
            .build()
            .fetch_all(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?;

        let mut by_product: HashMap<i64, Vec<DeliveryOption>> = HashMap::new();
        for row in &rows {
            let product_id: i64 = row
                .try_get("product_id")
                .map_err(|e| RepositoryError::Storage(e.to_string()))?;
            by_product
                .entry(product_id)
                .or_default()
                .push(row_to_delivery_option(row)?);
        }
        Ok(by_product)
    }

    /// Replace a product's delivery links.
    pub async fn assign(
        &mut self,
        product_id: i64,
        option_ids: &[i64],
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM product_delivery_options WHERE product_id = ?")
            .bind(product_id)
            .execute(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?;

        for option_id in option_ids {
            sqlx::query(
                "INSERT INTO product_delivery_options (product_id, delivery_option_id) VALUES (?, ?)",
            )
            .bind(product_id)
            .bind(option_id)
            .execute(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?;
        }
        Ok(())
    }
}
