//! Orders, item snapshots, and status history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use sparehub_core::{
    AddressId, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId,
    StatusHistoryId, UserId,
};

/// An order header.
///
/// Created exactly once per checkout and immutable thereafter except for
/// `order_status`, `payment_status`, `tracking_number`, and `updated_at`.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub address_id: AddressId,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable snapshot of a product at purchase time.
///
/// Name, part number, and prices are copied so later product edits or
/// deactivation never change historical orders.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub part_number: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// One entry in an order's append-only status timeline.
#[derive(Debug, Clone, Serialize)]
pub struct OrderStatusHistory {
    pub id: StatusHistoryId,
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A freshly placed order with its item snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}
