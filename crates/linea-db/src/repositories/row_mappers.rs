//! Row mapping helpers for `SQLite` queries.

use chrono::{DateTime, SecondsFormat, Utc};
use linea_core::{
    Category, Currency, DeliveryOption, DeliverySpeed, ExchangeRate, Product, RepositoryError,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Decode, Row, Sqlite, Type};

/// Shared SELECT column list for product queries (table alias `p`).
///
/// Image bytes are deliberately left out; only their presence is reported.
pub const PRODUCT_SELECT_COLUMNS: &str = "p.id, p.title, p.description, p.price, p.category_id, p.is_saved, p.is_featured, (p.image_data IS NOT NULL) AS has_image, p.created_at, p.updated_at";

/// Shared SELECT column list for delivery option queries (table alias `d`).
pub const DELIVERY_OPTION_SELECT_COLUMNS: &str = "d.id, d.name, d.description, d.speed, d.price, d.min_order_amount, d.estimated_days_min, d.estimated_days_max, d.is_active, d.created_at, d.updated_at";

/// Map a sqlx error onto the storage-agnostic repository error.
pub fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::RowNotFound => RepositoryError::NotFound(err.to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::AlreadyExists(db.message().to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() || db.is_check_violation() => {
            RepositoryError::Constraint(db.message().to_string())
        }
        _ => RepositoryError::Storage(err.to_string()),
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
pub fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| RepositoryError::Storage(e.to_string()))
}

fn currency_column(row: &SqliteRow, name: &str) -> Result<Currency, RepositoryError> {
    let code: String = column(row, name)?;
    code.parse()
        .map_err(|_| RepositoryError::Storage(format!("Unknown currency in {name}: {code}")))
}

/// Parse a database row into a Category.
pub fn row_to_category(row: &SqliteRow) -> Result<Category, RepositoryError> {
    Ok(Category {
        id: column(row, "id")?,
        name: column(row, "name")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

/// Parse a database row into a Product.
pub fn row_to_product(row: &SqliteRow) -> Result<Product, RepositoryError> {
    let has_image: i64 = column(row, "has_image")?;
    Ok(Product {
        id: column(row, "id")?,
        title: column(row, "title")?,
        description: column(row, "description")?,
        price: column(row, "price")?,
        category_id: column(row, "category_id")?,
        is_saved: column(row, "is_saved")?,
        is_featured: column(row, "is_featured")?,
        has_image: has_image != 0,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

/// Parse a database row into a DeliveryOption.
pub fn row_to_delivery_option(row: &SqliteRow) -> Result<DeliveryOption, RepositoryError> {
    let speed: String = column(row, "speed")?;
    let speed = DeliverySpeed::parse(&speed)
        .ok_or_else(|| RepositoryError::Storage(format!("Unknown delivery speed: {speed}")))?;

    Ok(DeliveryOption {
        id: column(row, "id")?,
        name: column(row, "name")?,
        description: column(row, "description")?,
        speed,
        price: column(row, "price")?,
        min_order_amount: column(row, "min_order_amount")?,
        estimated_days_min: column(row, "estimated_days_min")?,
        estimated_days_max: column(row, "estimated_days_max")?,
        is_active: column(row, "is_active")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

/// Parse a database row into an ExchangeRate.
pub fn row_to_exchange_rate(row: &SqliteRow) -> Result<ExchangeRate, RepositoryError> {
    Ok(ExchangeRate {
        base: currency_column(row, "base_currency")?,
        target: currency_column(row, "target_currency")?,
        rate: column(row, "rate")?,
        fetched_at: column(row, "fetched_at")?,
        expires_at: column(row, "expires_at")?,
    })
}
