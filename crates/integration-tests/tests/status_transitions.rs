//! Status transitions and timeline ordering against a real database.

use rust_decimal_macros::dec;

use sparehub_core::{OrderId, OrderStatus, PaymentMethod};
use sparehub_integration_tests::{
    add_cart_line, create_address, create_product, create_user, test_pool,
};
use sparehub_storefront::db::{OrderRepository, PlacementRequest, TransitionError};
use sparehub_storefront::models::PlacedOrder;

async fn place_test_order(pool: &sqlx::PgPool) -> PlacedOrder {
    let user = create_user(pool, "customer").await;
    let address = create_address(pool, user).await;
    let product = create_product(pool, dec!(100.00), dec!(0), 10).await;
    add_cart_line(pool, user, product, 1).await;

    OrderRepository::new(pool)
        .place_order(&PlacementRequest {
            user_id: user,
            address_id: address,
            payment_method: PaymentMethod::Cod,
            notes: None,
            tax_rate: dec!(0.18),
            shipping_rate: dec!(50),
            order_number_prefix: "ASH".to_string(),
        })
        .await
        .expect("place order")
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_transitions_append_history_in_order() {
    let pool = test_pool().await;
    let placed = place_test_order(&pool).await;
    let repo = OrderRepository::new(&pool);

    repo.transition_status(placed.order.id, OrderStatus::Confirmed, Some("picked up"), None)
        .await
        .expect("confirm");
    let (order, entry) = repo
        .transition_status(
            placed.order.id,
            OrderStatus::Shipped,
            None,
            Some("TRK-123456"),
        )
        .await
        .expect("ship");

    assert_eq!(order.order_status, OrderStatus::Shipped);
    assert_eq!(order.tracking_number.as_deref(), Some("TRK-123456"));
    assert_eq!(entry.status, OrderStatus::Shipped);

    let timeline = repo.timeline(placed.order.id).await.expect("timeline");
    let statuses: Vec<OrderStatus> = timeline.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Shipped
        ]
    );
    assert!(
        timeline
            .windows(2)
            .all(|pair| pair[0].created_at <= pair[1].created_at),
        "timeline must be in non-decreasing timestamp order"
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_tracking_number_survives_later_transitions() {
    let pool = test_pool().await;
    let placed = place_test_order(&pool).await;
    let repo = OrderRepository::new(&pool);

    repo.transition_status(placed.order.id, OrderStatus::Shipped, None, Some("TRK-1"))
        .await
        .expect("ship");
    let (order, _) = repo
        .transition_status(placed.order.id, OrderStatus::Delivered, None, None)
        .await
        .expect("deliver");

    assert_eq!(order.tracking_number.as_deref(), Some("TRK-1"));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_backward_transition_is_rejected() {
    let pool = test_pool().await;
    let placed = place_test_order(&pool).await;
    let repo = OrderRepository::new(&pool);

    repo.transition_status(placed.order.id, OrderStatus::Shipped, None, None)
        .await
        .expect("ship");

    let err = repo
        .transition_status(placed.order.id, OrderStatus::Confirmed, None, None)
        .await
        .expect_err("backward move must fail");

    match err {
        TransitionError::IllegalTransition { from, to } => {
            assert_eq!(from, OrderStatus::Shipped);
            assert_eq!(to, OrderStatus::Confirmed);
        }
        other => panic!("expected IllegalTransition, got {other:?}"),
    }

    // The failed attempt left no history entry.
    let timeline = repo.timeline(placed.order.id).await.expect("timeline");
    assert_eq!(timeline.len(), 2);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_terminal_orders_reject_all_transitions() {
    let pool = test_pool().await;
    let placed = place_test_order(&pool).await;
    let repo = OrderRepository::new(&pool);

    repo.transition_status(placed.order.id, OrderStatus::Cancelled, Some("customer request"), None)
        .await
        .expect("cancel");

    let err = repo
        .transition_status(placed.order.id, OrderStatus::Confirmed, None, None)
        .await
        .expect_err("terminal order must reject transitions");
    assert!(matches!(err, TransitionError::IllegalTransition { .. }));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_unknown_order_reports_not_found() {
    let pool = test_pool().await;

    let err = OrderRepository::new(&pool)
        .transition_status(OrderId::new(i64::MAX), OrderStatus::Confirmed, None, None)
        .await
        .expect_err("must fail");
    assert!(matches!(err, TransitionError::OrderNotFound));
}
