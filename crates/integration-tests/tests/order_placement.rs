//! Placement transaction postconditions.
//!
//! These tests require a running `PostgreSQL` database; point
//! `SPAREHUB_TEST_DATABASE_URL` at a disposable one and run with
//! `-- --ignored`.

use std::sync::atomic::{AtomicU32, Ordering};

use rust_decimal_macros::dec;
use sqlx::Row;

use sparehub_core::{OrderStatus, PaymentMethod, UserId};
use sparehub_integration_tests::{
    add_cart_line, cart_line_count, create_address, create_product, create_user, stock_of,
    test_pool, unique,
};
use sparehub_storefront::db::{
    OrderRepository, PlacementError, PlacementRequest, RepositoryError,
};

fn request(
    user_id: sparehub_core::UserId,
    address_id: sparehub_core::AddressId,
) -> PlacementRequest {
    PlacementRequest {
        user_id,
        address_id,
        payment_method: PaymentMethod::Cod,
        notes: None,
        tax_rate: dec!(0.18),
        shipping_rate: dec!(50),
        order_number_prefix: "ASH".to_string(),
    }
}

async fn order_count(pool: &sqlx::PgPool, user_id: UserId) -> i64 {
    sqlx::query("SELECT COUNT(*) AS n FROM orders WHERE user_id = $1")
        .bind(user_id.as_i64())
        .fetch_one(pool)
        .await
        .expect("count orders")
        .get("n")
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_placement_postconditions() {
    let pool = test_pool().await;
    let user = create_user(&pool, "customer").await;
    let address = create_address(&pool, user).await;
    let product = create_product(&pool, dec!(100.00), dec!(10), 5).await;
    add_cart_line(&pool, user, product, 2).await;

    let placed = OrderRepository::new(&pool)
        .place_order(&request(user, address))
        .await
        .expect("placement should succeed");

    // Totals: 2 x 90.00 discounted units, 18% tax, flat 50 shipping.
    assert_eq!(placed.order.subtotal, dec!(180.00));
    assert_eq!(placed.order.tax_amount, dec!(32.40));
    assert_eq!(placed.order.shipping_amount, dec!(50.00));
    assert_eq!(placed.order.total_amount, dec!(262.40));
    assert_eq!(placed.order.order_status, OrderStatus::Pending);
    assert!(placed.order.order_number.starts_with("ASH-"));

    // Item snapshot carries the discounted unit price.
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].unit_price, dec!(90.00));
    assert_eq!(placed.items[0].total_price, dec!(180.00));
    assert_eq!(placed.items[0].quantity, 2);

    // Cart consumed, stock decremented.
    assert_eq!(cart_line_count(&pool, user).await, 0);
    assert_eq!(stock_of(&pool, product).await, 3);

    // Exactly one history entry, recording the placement.
    let timeline = OrderRepository::new(&pool)
        .timeline(placed.order.id)
        .await
        .expect("timeline");
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].status, OrderStatus::Pending);
    assert_eq!(timeline[0].notes.as_deref(), Some("Order placed successfully"));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_item_totals_sum_to_subtotal() {
    let pool = test_pool().await;
    let user = create_user(&pool, "customer").await;
    let address = create_address(&pool, user).await;
    let a = create_product(&pool, dec!(19.99), dec!(0), 10).await;
    let b = create_product(&pool, dec!(333.33), dec!(7), 10).await;
    add_cart_line(&pool, user, a, 3).await;
    add_cart_line(&pool, user, b, 2).await;

    let placed = OrderRepository::new(&pool)
        .place_order(&request(user, address))
        .await
        .expect("placement should succeed");

    let item_sum: rust_decimal::Decimal =
        placed.items.iter().map(|item| item.total_price).sum();
    assert_eq!(item_sum, placed.order.subtotal);
    assert_eq!(
        placed.order.total_amount,
        placed.order.subtotal + placed.order.tax_amount + placed.order.shipping_amount
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_insufficient_stock_rolls_back_everything() {
    let pool = test_pool().await;
    let user = create_user(&pool, "customer").await;
    let address = create_address(&pool, user).await;
    let product = create_product(&pool, dec!(50.00), dec!(0), 1).await;
    add_cart_line(&pool, user, product, 3).await;

    let err = OrderRepository::new(&pool)
        .place_order(&request(user, address))
        .await
        .expect_err("placement must fail");

    match err {
        PlacementError::InsufficientStock {
            requested,
            available,
            ..
        } => {
            assert_eq!(requested, 3);
            assert_eq!(available, 1);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // Nothing escaped the rolled-back transaction.
    assert_eq!(order_count(&pool, user).await, 0);
    assert_eq!(cart_line_count(&pool, user).await, 1);
    assert_eq!(stock_of(&pool, product).await, 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_inactive_product_counts_as_out_of_stock() {
    let pool = test_pool().await;
    let user = create_user(&pool, "customer").await;
    let address = create_address(&pool, user).await;
    let product = create_product(&pool, dec!(50.00), dec!(0), 10).await;
    add_cart_line(&pool, user, product, 1).await;

    sqlx::query("UPDATE products SET is_active = FALSE WHERE id = $1")
        .bind(product.as_i64())
        .execute(&pool)
        .await
        .expect("deactivate product");

    let err = OrderRepository::new(&pool)
        .place_order(&request(user, address))
        .await
        .expect_err("placement must fail");

    match err {
        PlacementError::InsufficientStock { available, .. } => assert_eq!(available, 0),
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_colliding_order_number_is_rerolled() {
    let pool = test_pool().await;
    let taken = unique("TAKEN");
    let fresh = unique("FRESH");
    let product = create_product(&pool, dec!(20.00), dec!(0), 10).await;

    // First placement claims the fixed number.
    let first = create_user(&pool, "customer").await;
    let first_address = create_address(&pool, first).await;
    add_cart_line(&pool, first, product, 1).await;
    let claimant = {
        let taken = taken.clone();
        OrderRepository::with_number_source(&pool, move |prefix| format!("{prefix}-{taken}"))
    };
    claimant
        .place_order(&request(first, first_address))
        .await
        .expect("first placement");

    // Second placement rolls the taken number, then a fresh one.
    let second = create_user(&pool, "customer").await;
    let second_address = create_address(&pool, second).await;
    add_cart_line(&pool, second, product, 1).await;
    let rolls = AtomicU32::new(0);
    let repo = {
        let taken = taken.clone();
        let fresh = fresh.clone();
        OrderRepository::with_number_source(&pool, move |prefix| {
            if rolls.fetch_add(1, Ordering::SeqCst) == 0 {
                format!("{prefix}-{taken}")
            } else {
                format!("{prefix}-{fresh}")
            }
        })
    };

    let placed = repo
        .place_order(&request(second, second_address))
        .await
        .expect("collision must re-roll and succeed");

    assert!(placed.order.order_number.ends_with(&fresh));
    assert_eq!(cart_line_count(&pool, second).await, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_exhausted_number_rerolls_surface_a_conflict() {
    let pool = test_pool().await;
    let taken = unique("TAKEN");
    let product = create_product(&pool, dec!(20.00), dec!(0), 10).await;

    let first = create_user(&pool, "customer").await;
    let first_address = create_address(&pool, first).await;
    add_cart_line(&pool, first, product, 1).await;
    let claimant = {
        let taken = taken.clone();
        OrderRepository::with_number_source(&pool, move |prefix| format!("{prefix}-{taken}"))
    };
    claimant
        .place_order(&request(first, first_address))
        .await
        .expect("first placement");

    // Every roll collides; the retry budget runs out.
    let second = create_user(&pool, "customer").await;
    let second_address = create_address(&pool, second).await;
    add_cart_line(&pool, second, product, 1).await;
    let repo = {
        let taken = taken.clone();
        OrderRepository::with_number_source(&pool, move |prefix| format!("{prefix}-{taken}"))
    };

    let err = repo
        .place_order(&request(second, second_address))
        .await
        .expect_err("exhausted retries must fail");

    assert!(matches!(
        err,
        PlacementError::Repository(RepositoryError::Conflict(_))
    ));
    // The failed placement left the loser's cart and the stock intact.
    assert_eq!(cart_line_count(&pool, second).await, 1);
    assert_eq!(stock_of(&pool, product).await, 9);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_empty_cart_is_rejected() {
    let pool = test_pool().await;
    let user = create_user(&pool, "customer").await;
    let address = create_address(&pool, user).await;

    let err = OrderRepository::new(&pool)
        .place_order(&request(user, address))
        .await
        .expect_err("placement must fail");

    assert!(matches!(err, PlacementError::EmptyCart));
    assert_eq!(order_count(&pool, user).await, 0);
}
