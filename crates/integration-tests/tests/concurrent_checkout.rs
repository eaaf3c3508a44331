//! Concurrent checkout of the last unit: exactly one order wins and stock
//! never goes negative.

use rust_decimal_macros::dec;

use sparehub_core::PaymentMethod;
use sparehub_integration_tests::{
    add_cart_line, create_address, create_product, create_user, stock_of, test_pool,
};
use sparehub_storefront::db::{OrderRepository, PlacementError, PlacementRequest};

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_last_unit_goes_to_exactly_one_buyer() {
    let pool = test_pool().await;
    let product = create_product(&pool, dec!(75.00), dec!(0), 1).await;

    let alice = create_user(&pool, "customer").await;
    let alice_address = create_address(&pool, alice).await;
    add_cart_line(&pool, alice, product, 1).await;

    let bob = create_user(&pool, "customer").await;
    let bob_address = create_address(&pool, bob).await;
    add_cart_line(&pool, bob, product, 1).await;

    let request = |user_id, address_id| PlacementRequest {
        user_id,
        address_id,
        payment_method: PaymentMethod::Cod,
        notes: None,
        tax_rate: dec!(0.18),
        shipping_rate: dec!(50),
        order_number_prefix: "ASH".to_string(),
    };

    let pool_a = pool.clone();
    let pool_b = pool.clone();
    let req_a = request(alice, alice_address);
    let req_b = request(bob, bob_address);

    let (a, b) = tokio::join!(
        tokio::spawn(async move { OrderRepository::new(&pool_a).place_order(&req_a).await }),
        tokio::spawn(async move { OrderRepository::new(&pool_b).place_order(&req_b).await }),
    );
    let a = a.expect("task a");
    let b = b.expect("task b");

    let winners = usize::from(a.is_ok()) + usize::from(b.is_ok());
    assert_eq!(winners, 1, "exactly one checkout must win");

    // The loser saw either the precheck or the conditional decrement fail.
    for result in [a, b] {
        if let Err(e) = result {
            assert!(
                matches!(
                    e,
                    PlacementError::InsufficientStock { .. }
                        | PlacementError::StockConflict { .. }
                ),
                "unexpected loser error: {e:?}"
            );
        }
    }

    assert_eq!(stock_of(&pool, product).await, 0);
}
