//! Database integration test harness for SpareHub.
//!
//! # Running Tests
//!
//! ```bash
//! # Point the harness at a disposable database
//! export SPAREHUB_TEST_DATABASE_URL=postgres://localhost/sparehub_test
//!
//! # Run the ignored, database-backed tests
//! cargo test -p sparehub-integration-tests -- --ignored
//! ```
//!
//! Every test creates its own users and products with unique natural keys,
//! so tests can run concurrently against one database. Migrations are
//! applied on first pool creation.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use sparehub_core::{AddressId, ProductId, UserId};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// A value unique across this process and (practically) across runs.
#[must_use]
pub fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{nanos}-{n}")
}

/// Connect to the test database and apply migrations.
pub async fn test_pool() -> PgPool {
    dotenvy::dotenv().ok();

    let url = std::env::var("SPAREHUB_TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("SPAREHUB_TEST_DATABASE_URL must point at a disposable database");

    let pool = PgPool::connect(&url).await.expect("connect test database");

    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .expect("apply migrations");

    pool
}

/// Insert a user and return its ID.
pub async fn create_user(pool: &PgPool, role: &str) -> UserId {
    let email = format!("{}@test.sparehub", unique("user"));
    let row = sqlx::query(
        "INSERT INTO users (name, email, role) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind("Test User")
    .bind(&email)
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("insert user");

    UserId::new(row.get("id"))
}

/// Insert a product and return its ID.
pub async fn create_product(
    pool: &PgPool,
    price: Decimal,
    discount: Decimal,
    stock: i32,
) -> ProductId {
    let row = sqlx::query(
        r"
        INSERT INTO products (name, part_number, price, discount, stock_quantity)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        ",
    )
    .bind(unique("Part"))
    .bind(unique("PN"))
    .bind(price)
    .bind(discount)
    .bind(stock)
    .fetch_one(pool)
    .await
    .expect("insert product");

    ProductId::new(row.get("id"))
}

/// Insert a shipping address for a user and return its ID.
pub async fn create_address(pool: &PgPool, user_id: UserId) -> AddressId {
    let row = sqlx::query(
        r"
        INSERT INTO addresses (user_id, full_name, phone, address_line1,
                               city, state, postal_code, country)
        VALUES ($1, 'Test User', '5550100', '1 Test Lane',
                'Testville', 'TS', '000001', 'India')
        RETURNING id
        ",
    )
    .bind(user_id.as_i64())
    .fetch_one(pool)
    .await
    .expect("insert address");

    AddressId::new(row.get("id"))
}

/// Put a product in a user's cart.
pub async fn add_cart_line(pool: &PgPool, user_id: UserId, product_id: ProductId, quantity: i32) {
    sqlx::query(
        "INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3)",
    )
    .bind(user_id.as_i64())
    .bind(product_id.as_i64())
    .bind(quantity)
    .execute(pool)
    .await
    .expect("insert cart line");
}

/// Current stock of a product.
pub async fn stock_of(pool: &PgPool, product_id: ProductId) -> i32 {
    sqlx::query("SELECT stock_quantity FROM products WHERE id = $1")
        .bind(product_id.as_i64())
        .fetch_one(pool)
        .await
        .expect("read stock")
        .get("stock_quantity")
}

/// Number of cart lines a user currently has.
pub async fn cart_line_count(pool: &PgPool, user_id: UserId) -> i64 {
    sqlx::query("SELECT COUNT(*) AS n FROM cart_items WHERE user_id = $1")
        .bind(user_id.as_i64())
        .fetch_one(pool)
        .await
        .expect("count cart lines")
        .get("n")
}
