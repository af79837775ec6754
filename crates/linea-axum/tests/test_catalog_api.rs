//! Category, product and delivery option endpoints against the seeded catalog.

mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

use common::{client, seeded_db, test_app};

fn ids(value: &Value) -> Vec<i64> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn health_reports_healthy() {
    let app = test_app().await;
    let db = seeded_db().await;
    let client = client(&app, &db);

    let response = client.get("/health").await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({
            "status": "healthy",
            "message": "E-commerce API with multi-currency support is running"
        })
    );
}

#[tokio::test]
async fn create_category_and_reject_duplicates() {
    let app = test_app().await;
    let db = seeded_db().await;
    let client = client(&app, &db);

    let response = client
        .post_json("/categories", &json!({"name": "  Garden  "}))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["name"], "Garden");

    let response = client
        .post_json("/categories", &json!({"name": "Garden"}))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(
        response.json()["detail"],
        "Category with name 'Garden' already exists"
    );

    let response = client
        .post_json("/categories", &json!({"name": "   "}))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["details"]["fields"][0]["field"], "name");
}

#[tokio::test]
async fn category_detail_lists_products_by_id() {
    let app = test_app().await;
    let db = seeded_db().await;
    let client = client(&app, &db);

    // Categories are created in name order: electronics is 1, jewelery is 2.
    let response = client.get("/categories/2").await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["name"], "jewelery");
    assert_eq!(ids(&body["products"]), vec![5, 6, 7, 8]);
    assert_eq!(body["products"][0]["image_url"], "/products/5/image");

    let response = client.get("/categories/999").await.unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["detail"], "Category not found");
}

#[tokio::test]
async fn storefront_categories_skip_empty_ones() {
    let app = test_app().await;
    let db = seeded_db().await;
    let client = client(&app, &db);

    client
        .post_json("/categories", &json!({"name": "aaa empty"}))
        .await
        .unwrap();

    let all = client.get("/categories").await.unwrap().json();
    let non_empty = client.get("/api/categories").await.unwrap().json();
    assert_eq!(all.as_array().map(Vec::len), Some(5));
    assert_eq!(non_empty.as_array().map(Vec::len), Some(4));
    assert_eq!(non_empty[0]["name"], "electronics");
}

#[tokio::test]
async fn delivery_options_are_fastest_first() {
    let app = test_app().await;
    let db = seeded_db().await;
    let client = client(&app, &db);

    let body = client.get("/api/delivery-options").await.unwrap().json();
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "Same Day Delivery",
            "Express Delivery",
            "Next Day Delivery",
            "Standard Shipping"
        ]
    );
    assert_eq!(body[0]["speed"], "same_day");
}

#[tokio::test]
async fn product_listing_filters_by_category() {
    let app = test_app().await;
    let db = seeded_db().await;
    let client = client(&app, &db);

    let body = client.get("/products?category_id=1").await.unwrap().json();
    let mut found = ids(&body);
    found.sort_unstable();
    assert_eq!(found, vec![9, 10]);
    assert_eq!(body[0]["category"]["name"], "electronics");
    assert!(body[0]["delivery_summary"].is_null());

    let body = client
        .get("/products?include_delivery_summary=true")
        .await
        .unwrap()
        .json();
    assert_eq!(body.as_array().map(Vec::len), Some(12));
    assert!(body.as_array().unwrap().iter().all(|p| !p["delivery_summary"].is_null()));
}

#[tokio::test]
async fn storefront_listing_sorts_and_summarises() {
    let app = test_app().await;
    let db = seeded_db().await;
    let client = client(&app, &db);

    let body = client.get("/api/products").await.unwrap().json();
    assert_eq!(ids(&body)[..3], [12, 11, 10]);

    // Product 12 only has Standard (free, 3-5 days) and Express (1-2 days).
    let summary = &body[0]["delivery_summary"];
    assert_eq!(summary["has_free"], true);
    assert_eq!(summary["cheapest_price"], 0.0);
    assert_eq!(summary["fastest_days_min"], 1);
    assert_eq!(summary["fastest_days_max"], 2);
    assert_eq!(summary["options_count"], 2);
    assert!(body[0]["cart_count"].is_null());

    let body = client.get("/api/products?sort=price_asc").await.unwrap().json();
    assert_eq!(ids(&body)[0], 11);
    let body = client.get("/api/products?sort=price_desc").await.unwrap().json();
    assert_eq!(ids(&body)[0], 5);

    let body = client
        .get("/api/products?include_delivery_summary=false")
        .await
        .unwrap()
        .json();
    assert!(body[0]["delivery_summary"].is_null());
}

#[tokio::test]
async fn storefront_listing_filters_by_delivery_option() {
    let app = test_app().await;
    let db = seeded_db().await;
    let client = client(&app, &db);

    let options = client.get("/api/delivery-options").await.unwrap().json();
    let same_day = options[0]["id"].as_i64().unwrap();

    let body = client
        .get(&format!("/api/products?deliveryOptionId={same_day}&categoryId=3"))
        .await
        .unwrap()
        .json();
    assert_eq!(ids(&body), vec![2, 1]);
}

#[tokio::test]
async fn product_detail_has_sorted_active_options() {
    let app = test_app().await;
    let db = seeded_db().await;
    let client = client(&app, &db);

    let body = client.get("/products/1").await.unwrap().json();
    let prices: Vec<f64> = body["delivery_options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["price"].as_f64().unwrap())
        .collect();
    assert_eq!(prices, vec![0.0, 9.99, 19.99, 24.99]);
    assert_eq!(body["image_url"], "/products/1/image");

    let response = client.get("/products/99999").await.unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["detail"], "Product not found");
}

#[tokio::test]
async fn product_crud_round() {
    let app = test_app().await;
    let db = seeded_db().await;
    let client = client(&app, &db);

    let response = client
        .post_json(
            "/products",
            &json!({
                "title": "  Test Product  ",
                "description": "A test product",
                "price": 29.99,
                "category_id": 1
            }),
        )
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    let created = response.json();
    assert_eq!(created["title"], "Test Product");
    assert!(created["image_url"].is_null());
    assert!(created["category"].is_null());
    let id = created["id"].as_i64().unwrap();

    let response = client
        .put_json(&format!("/products/{id}"), &json!({"price": 19.99, "is_featured": true}))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["price"], 19.99);
    assert_eq!(response.json()["is_featured"], true);
    assert_eq!(response.json()["title"], "Test Product");

    let response = client.delete(&format!("/products/{id}")).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({"message": "Product deleted successfully"})
    );

    let response = client.delete(&format!("/products/{id}")).await.unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_writes_check_the_category() {
    let app = test_app().await;
    let db = seeded_db().await;
    let client = client(&app, &db);

    let response = client
        .post_json(
            "/products",
            &json!({"title": "T", "description": "D", "price": 1.0, "category_id": 999}),
        )
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["detail"], "Category not found");

    let response = client
        .put_json("/products/1", &json!({"category_id": 999}))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = client
        .put_json("/products/99999", &json!({"title": "Nope"}))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn product_image_is_served_with_cache_headers() {
    let app = test_app().await;
    let db = seeded_db().await;
    let client = client(&app, &db);

    let response = client.get("/products/3/image").await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("image/png"));
    assert_eq!(
        response.header("content-disposition"),
        Some("inline; filename=\"product_3.png\"")
    );
    assert_eq!(
        response.header("cache-control"),
        Some("public, max-age=86400")
    );
    assert_eq!(&response.body[..4], b"\x89PNG");

    let created = client
        .post_json(
            "/products",
            &json!({"title": "T", "description": "D", "price": 1.0, "category_id": 1}),
        )
        .await
        .unwrap()
        .json();
    let response = client
        .get(&format!("/products/{}/image", created["id"]))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["detail"], "No image found for this product");
}
