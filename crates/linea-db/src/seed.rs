//! Deterministic fixture data.
//!
//! `seed_database()` fills an empty database with the demo catalog and is a
//! no-op for rows that already exist, so it can run on every start. Products
//! keep fixed ids; categories are created in name order.
//!
//! Delivery assignment is by product id: every product gets Standard and
//! Express, the first third also get Next Day, the first fifth also get Same
//! Day (at least one product each).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::SqlitePool;
use thiserror::Error;

use linea_core::{
    Currency, DeliverySpeed, NewCategory, ProductImage, RepositoryError,
    settings::DEFAULT_FX_TTL_SECONDS,
};

use crate::repositories::{encode_timestamp, map_sqlx_error};
use crate::session::{DbSession, DbTransaction};

/// Errors raised while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Fixture data refers to a row that was not created.
    #[error("Seed data references unknown {kind} '{name}'")]
    MissingReference { kind: &'static str, name: String },
}

/// What a seeding run inserted. Zero everywhere means the data was already there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories_created: usize,
    pub products_created: usize,
    pub delivery_options_created: usize,
    pub rates_stored: usize,
}

struct SeedProduct {
    id: i64,
    title: &'static str,
    description: &'static str,
    price: f64,
    category: &'static str,
}

struct SeedDeliveryOption {
    name: &'static str,
    description: &'static str,
    speed: DeliverySpeed,
    price: f64,
    min_order_amount: Option<f64>,
    days_min: i64,
    days_max: i64,
}

pub const STANDARD_SHIPPING: &str = "Standard Shipping";
pub const EXPRESS_DELIVERY: &str = "Express Delivery";
pub const NEXT_DAY_DELIVERY: &str = "Next Day Delivery";
pub const SAME_DAY_DELIVERY: &str = "Same Day Delivery";

const SEED_PRODUCTS: [SeedProduct; 12] = [
    SeedProduct {
        id: 1,
        title: "Fjallraven - Foldsack No. 1 Backpack, Fits 15 Laptops",
        description: "Your perfect pack for everyday use and walks in the forest. Stash your laptop (up to 15 inches) in the padded sleeve.",
        price: 109.95,
        category: "men's clothing",
    },
    SeedProduct {
        id: 2,
        title: "Mens Casual Premium Slim Fit T-Shirts",
        description: "Slim-fitting style, contrast raglan long sleeve, three-button henley placket, light weight and soft fabric.",
        price: 22.3,
        category: "men's clothing",
    },
    SeedProduct {
        id: 3,
        title: "Mens Cotton Jacket",
        description: "Great outerwear jacket for spring, autumn and winter, suitable for many occasions such as working, hiking or camping.",
        price: 55.99,
        category: "men's clothing",
    },
    SeedProduct {
        id: 4,
        title: "Mens Casual Slim Fit",
        description: "The color could be slightly different between on the screen and in practice.",
        price: 15.99,
        category: "men's clothing",
    },
    SeedProduct {
        id: 5,
        title: "John Hardy Women's Legends Naga Gold & Silver Dragon Station Chain Bracelet",
        description: "From our Legends Collection, the Naga was inspired by the mythical water dragon that protects the ocean's pearl.",
        price: 695.0,
        category: "jewelery",
    },
    SeedProduct {
        id: 6,
        title: "Solid Gold Petite Micropave",
        description: "Satisfaction guaranteed. Return or exchange any order within 30 days.",
        price: 168.0,
        category: "jewelery",
    },
    SeedProduct {
        id: 7,
        title: "White Gold Plated Princess",
        description: "Classic created wedding engagement solitaire diamond promise ring for her.",
        price: 9.99,
        category: "jewelery",
    },
    SeedProduct {
        id: 8,
        title: "Pierced Owl Rose Gold Plated Stainless Steel Double",
        description: "Rose gold plated double flared tunnel plug earrings made of 316L stainless steel.",
        price: 10.99,
        category: "jewelery",
    },
    SeedProduct {
        id: 9,
        title: "WD 2TB Elements Portable External Hard Drive - USB 3.0",
        description: "USB 3.0 and USB 2.0 compatibility, fast data transfers, improved PC performance, high capacity.",
        price: 64.0,
        category: "electronics",
    },
    SeedProduct {
        id: 10,
        title: "SanDisk SSD PLUS 1TB Internal SSD - SATA III 6 Gb/s",
        description: "Easy upgrade for faster boot up, shutdown, application load and response.",
        price: 109.0,
        category: "electronics",
    },
    SeedProduct {
        id: 11,
        title: "Opna Women's Short Sleeve Moisture",
        description: "100% polyester, machine wash, lightweight, roomy and highly breathable with moisture wicking fabric.",
        price: 7.95,
        category: "women's clothing",
    },
    SeedProduct {
        id: 12,
        title: "MBJ Women's Solid Short Sleeve Boat Neck V",
        description: "95% rayon, 5% spandex, made in USA or imported, lightweight fabric with great stretch for comfort.",
        price: 9.85,
        category: "women's clothing",
    },
];

const SEED_DELIVERY_OPTIONS: [SeedDeliveryOption; 4] = [
    SeedDeliveryOption {
        name: STANDARD_SHIPPING,
        description: "3-5 business days",
        speed: DeliverySpeed::Standard,
        price: 0.0,
        min_order_amount: Some(25.0),
        days_min: 3,
        days_max: 5,
    },
    SeedDeliveryOption {
        name: EXPRESS_DELIVERY,
        description: "1-2 business days",
        speed: DeliverySpeed::Express,
        price: 9.99,
        min_order_amount: None,
        days_min: 1,
        days_max: 2,
    },
    SeedDeliveryOption {
        name: NEXT_DAY_DELIVERY,
        description: "Next business day",
        speed: DeliverySpeed::NextDay,
        price: 19.99,
        min_order_amount: None,
        days_min: 1,
        days_max: 1,
    },
    SeedDeliveryOption {
        name: SAME_DAY_DELIVERY,
        description: "Same day (order by 2pm)",
        speed: DeliverySpeed::SameDay,
        price: 24.99,
        min_order_amount: None,
        days_min: 0,
        days_max: 0,
    },
];

/// Baseline `1 USD = rate` snapshot so conversions work without a provider.
pub const BASELINE_USD_RATES: [(Currency, f64); 5] = [
    (Currency::Eur, 0.92),
    (Currency::Gbp, 0.79),
    (Currency::Jpy, 149.5),
    (Currency::Aud, 1.52),
    (Currency::Mxn, 17.1),
];

/// 1x1 transparent PNG stored as every seeded product's image.
pub const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

/// Number of seeded products.
pub const SEED_PRODUCT_COUNT: usize = SEED_PRODUCTS.len();

/// Seed the demo catalog inside a single transaction.
///
/// # Errors
///
/// Returns an error if any insert fails; nothing is committed in that case.
pub async fn seed_database(pool: &SqlitePool) -> Result<SeedReport, SeedError> {
    let mut session = DbSession::open(pool).await?;
    let mut tx = session.begin().await?;
    let mut report = SeedReport::default();

    let category_ids = seed_categories(&mut tx, &mut report).await?;
    seed_products(&mut tx, &category_ids, &mut report).await?;
    let option_ids = seed_delivery_options(&mut tx, &mut report).await?;
    assign_delivery_options(&mut tx, &option_ids).await?;
    seed_rates(&mut tx, &mut report).await?;

    tx.commit().await?;

    tracing::info!(
        categories = report.categories_created,
        products = report.products_created,
        delivery_options = report.delivery_options_created,
        rates = report.rates_stored,
        "Database seeding completed"
    );
    Ok(report)
}

/// Stable creation time so newest-first ordering follows product ids.
fn seeded_at(product_id: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
        + Duration::minutes(product_id)
}

async fn seed_categories(
    tx: &mut DbTransaction<'_>,
    report: &mut SeedReport,
) -> Result<BTreeMap<&'static str, i64>, SeedError> {
    let names: BTreeSet<&'static str> = SEED_PRODUCTS.iter().map(|p| p.category).collect();
    let mut ids = BTreeMap::new();

    for name in names {
        let id = if let Some(existing) = tx.categories().find_by_name(name).await? {
            existing.id
        } else {
            report.categories_created += 1;
            tx.categories().create(&NewCategory::new(name)).await?.id
        };
        ids.insert(name, id);
    }
    Ok(ids)
}

async fn seed_products(
    tx: &mut DbTransaction<'_>,
    category_ids: &BTreeMap<&'static str, i64>,
    report: &mut SeedReport,
) -> Result<(), SeedError> {
    for product in &SEED_PRODUCTS {
        let category_id =
            *category_ids
                .get(product.category)
                .ok_or_else(|| SeedError::MissingReference {
                    kind: "category",
                    name: product.category.to_string(),
                })?;
        let created = encode_timestamp(seeded_at(product.id));

        let result = sqlx::query(
            "INSERT OR IGNORE INTO products (id, title, description, price, category_id, is_saved, is_featured, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 0, 0, ?, ?)",
        )
        .bind(product.id)
        .bind(product.title)
        .bind(product.description)
        .bind(product.price)
        .bind(category_id)
        .bind(&created)
        .bind(&created)
        .execute(&mut *tx.connection())
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            tracing::debug!(product_id = product.id, "Product already seeded");
            continue;
        }

        let image = ProductImage {
            data: PLACEHOLDER_PNG.to_vec(),
            mime_type: Some("image/png".to_string()),
            filename: Some(format!("product_{}.png", product.id)),
        };
        tx.products().set_image(product.id, &image).await?;
        report.products_created += 1;
    }
    Ok(())
}

async fn seed_delivery_options(
    tx: &mut DbTransaction<'_>,
    report: &mut SeedReport,
) -> Result<BTreeMap<&'static str, i64>, SeedError> {
    let mut ids = BTreeMap::new();
    let now = encode_timestamp(Utc::now());

    for option in &SEED_DELIVERY_OPTIONS {
        if let Some(existing) = tx.delivery_options().find_by_name(option.name).await? {
            ids.insert(option.name, existing.id);
            continue;
        }

        let result = sqlx::query(
            "INSERT INTO delivery_options (name, description, speed, price, min_order_amount, estimated_days_min, estimated_days_max, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(option.name)
        .bind(option.description)
        .bind(option.speed.as_str())
        .bind(option.price)
        .bind(option.min_order_amount)
        .bind(option.days_min)
        .bind(option.days_max)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx.connection())
        .await
        .map_err(map_sqlx_error)?;

        ids.insert(option.name, result.last_insert_rowid());
        report.delivery_options_created += 1;
    }
    Ok(ids)
}

async fn assign_delivery_options(
    tx: &mut DbTransaction<'_>,
    option_ids: &BTreeMap<&'static str, i64>,
) -> Result<(), SeedError> {
    let option = |name: &'static str| {
        option_ids
            .get(name)
            .copied()
            .ok_or_else(|| SeedError::MissingReference {
                kind: "delivery option",
                name: name.to_string(),
            })
    };
    let standard = option(STANDARD_SHIPPING)?;
    let express = option(EXPRESS_DELIVERY)?;
    let next_day = option(NEXT_DAY_DELIVERY)?;
    let same_day = option(SAME_DAY_DELIVERY)?;

    let product_ids: Vec<(i64,)> = sqlx::query_as("SELECT id FROM products ORDER BY id")
        .fetch_all(&mut *tx.connection())
        .await
        .map_err(map_sqlx_error)?;

    let (next_day_count, same_day_count) = fast_tier_counts(product_ids.len());

    for (index, (product_id,)) in product_ids.into_iter().enumerate() {
        let mut selected = vec![standard, express];
        if index < next_day_count {
            selected.push(next_day);
        }
        if index < same_day_count {
            // Same Day implies Next Day.
            if !selected.contains(&next_day) {
                selected.push(next_day);
            }
            selected.push(same_day);
        }
        tx.delivery_options().assign(product_id, &selected).await?;
    }
    Ok(())
}

/// How many of the lowest ids get Next Day and Same Day: a third and a fifth,
/// never fewer than one.
const fn fast_tier_counts(products: usize) -> (usize, usize) {
    let next_day = products / 3;
    let same_day = products / 5;
    (
        if next_day == 0 { 1 } else { next_day },
        if same_day == 0 { 1 } else { same_day },
    )
}

async fn seed_rates(tx: &mut DbTransaction<'_>, report: &mut SeedReport) -> Result<(), SeedError> {
    if tx.exchange_rates().last_fetched(Currency::Usd).await?.is_some() {
        return Ok(());
    }

    let rates: BTreeMap<Currency, f64> = BASELINE_USD_RATES.into_iter().collect();
    let ttl = Duration::seconds(i64::try_from(DEFAULT_FX_TTL_SECONDS).unwrap_or(3600));
    report.rates_stored = tx
        .exchange_rates()
        .store(Currency::Usd, &rates, Utc::now(), ttl)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::ProductFilter;
    use crate::setup::setup_test_database;
    use linea_core::ProductSort;

    #[tokio::test]
    async fn test_seed_creates_fixture_rows() {
        let pool = setup_test_database().await.unwrap();
        let report = seed_database(&pool).await.unwrap();

        assert_eq!(
            report,
            SeedReport {
                categories_created: 4,
                products_created: 12,
                delivery_options_created: 4,
                rates_stored: 5,
            }
        );

        let mut session = DbSession::open(&pool).await.unwrap();
        let names: Vec<String> = session
            .categories()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(
            names,
            vec!["electronics", "jewelery", "men's clothing", "women's clothing"]
        );

        let newest = session
            .products()
            .list(&ProductFilter {
                sort: ProductSort::CreatedDesc,
                ..ProductFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(newest.len(), SEED_PRODUCT_COUNT);
        assert_eq!(newest[0].id, 12);
        assert!(newest.iter().all(|p| p.has_image));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let pool = setup_test_database().await.unwrap();
        seed_database(&pool).await.unwrap();
        let second = seed_database(&pool).await.unwrap();
        assert_eq!(second, SeedReport::default());

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 12);
    }

    #[tokio::test]
    async fn test_delivery_assignment_by_product_id() {
        let pool = setup_test_database().await.unwrap();
        seed_database(&pool).await.unwrap();
        let mut session = DbSession::open(&pool).await.unwrap();

        let options = session
            .delivery_options()
            .for_products(&(1..=12).collect::<Vec<_>>())
            .await
            .unwrap();

        let names = |id: i64| -> Vec<String> {
            let mut names: Vec<String> = options[&id].iter().map(|o| o.name.clone()).collect();
            names.sort();
            names
        };
        assert_eq!(names(1).len(), 4);
        assert_eq!(names(2).len(), 4);
        assert_eq!(names(3), vec![EXPRESS_DELIVERY, NEXT_DAY_DELIVERY, STANDARD_SHIPPING]);
        assert_eq!(names(4).len(), 3);
        assert_eq!(names(5), vec![EXPRESS_DELIVERY, STANDARD_SHIPPING]);
        assert_eq!(names(12).len(), 2);

        let active = session.delivery_options().list_active().await.unwrap();
        let order: Vec<&str> = active.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(
            order,
            vec![SAME_DAY_DELIVERY, EXPRESS_DELIVERY, NEXT_DAY_DELIVERY, STANDARD_SHIPPING]
        );
    }

    #[test]
    fn test_fast_tiers_never_empty() {
        assert_eq!(fast_tier_counts(12), (4, 2));
        assert_eq!(fast_tier_counts(4), (1, 1));
        assert_eq!(fast_tier_counts(2), (1, 1));
        assert_eq!(fast_tier_counts(15), (5, 3));
    }

    #[tokio::test]
    async fn test_seed_image_is_png() {
        let pool = setup_test_database().await.unwrap();
        seed_database(&pool).await.unwrap();
        let mut session = DbSession::open(&pool).await.unwrap();

        let image = session.products().image(7).await.unwrap().unwrap();
        assert_eq!(image.content_type(), "image/png");
        assert_eq!(image.display_filename(7), "product_7.png");
        assert_eq!(&image.data[1..4], b"PNG");
    }
}
