//! Order persistence: the placement transaction, status transitions, and
//! timeline reads.
//!
//! Placement is the one genuinely concurrent-sensitive path in the system.
//! The stock check-then-decrement race is closed with a conditional
//! decrement (`UPDATE … SET stock_quantity = stock_quantity - qty WHERE …
//! AND stock_quantity >= qty`) whose affected-row count is verified; a zero
//! count aborts the whole transaction.

use std::str::FromStr;

use rand::Rng;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use thiserror::Error;
use tracing::{instrument, warn};

use sparehub_core::{
    AddressId, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId,
    StatusHistoryId, UserId,
};

use super::{RepositoryError, cart};
use crate::models::{CartLine, Order, OrderItem, OrderStatusHistory, PlacedOrder};
use crate::services::pricing::{self, QuoteLine};

/// How many times a colliding order number is re-rolled before giving up.
const MAX_ORDER_NUMBER_ATTEMPTS: u32 = 3;

/// Characters used for the order number suffix.
const SUFFIX_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SUFFIX_LEN: usize = 6;

/// History note recorded for every new order.
const PLACED_NOTE: &str = "Order placed successfully";

/// Errors from the order placement transaction.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// The cart holds no lines; there is nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// A product cannot cover the requested quantity (or is inactive).
    #[error("insufficient stock for {product_name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_name: String,
        requested: i32,
        available: i32,
    },

    /// A concurrent checkout consumed the stock between validation and
    /// decrement. The caller should retry the whole checkout.
    #[error("stock changed during checkout for {product_name}")]
    StockConflict { product_name: String },

    /// Underlying repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PlacementError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Errors from a status transition.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// No such order.
    #[error("order not found")]
    OrderNotFound,

    /// The transition violates the forward-progression rules.
    #[error("illegal transition: {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    /// Underlying repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for TransitionError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Everything the placement transaction needs besides the cart itself.
#[derive(Debug, Clone)]
pub struct PlacementRequest {
    pub user_id: UserId,
    pub address_id: AddressId,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub tax_rate: Decimal,
    pub shipping_rate: Decimal,
    pub order_number_prefix: String,
}

/// Repository for orders, item snapshots, and status history.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
    number_source: Option<Box<dyn Fn(&str) -> String + Send + Sync>>,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            number_source: None,
        }
    }

    /// Create a repository with a deterministic order-number generator.
    /// Lets tests force number collisions; production code uses [`new`].
    ///
    /// [`new`]: OrderRepository::new
    #[must_use]
    pub fn with_number_source(
        pool: &'a PgPool,
        source: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            pool,
            number_source: Some(Box::new(source)),
        }
    }

    fn next_order_number(&self, prefix: &str) -> String {
        match &self.number_source {
            Some(source) => source(prefix),
            None => generate_order_number(prefix),
        }
    }

    /// Convert a user's cart into an order, atomically.
    ///
    /// In one transaction: re-reads the cart, re-validates stock and the
    /// active flag, computes totals, inserts the order header and item
    /// snapshots, conditionally decrements stock, deletes the cart lines,
    /// and appends the initial `pending` history entry. Any failure rolls
    /// everything back.
    ///
    /// Order number collisions (unique constraint) re-roll the number and
    /// retry the transaction up to [`MAX_ORDER_NUMBER_ATTEMPTS`] times.
    ///
    /// # Errors
    ///
    /// Returns `PlacementError::EmptyCart`, `InsufficientStock`,
    /// `StockConflict`, or `Repository` as described in the variants.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn place_order(
        &self,
        request: &PlacementRequest,
    ) -> Result<PlacedOrder, PlacementError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let order_number = self.next_order_number(&request.order_number_prefix);

            match self.try_place(request, &order_number).await {
                Err(PlacementError::Repository(RepositoryError::Conflict(_)))
                    if attempt < MAX_ORDER_NUMBER_ATTEMPTS =>
                {
                    warn!(order_number, attempt, "order number collision, re-rolling");
                }
                result => return result,
            }
        }
    }

    async fn try_place(
        &self,
        request: &PlacementRequest,
        order_number: &str,
    ) -> Result<PlacedOrder, PlacementError> {
        let mut tx = self.pool.begin().await?;

        // Fresh cart snapshot under the transaction's isolation.
        let rows = sqlx::query(cart::LINES_FOR_USER_SQL)
            .bind(request.user_id.as_i64())
            .fetch_all(&mut *tx)
            .await?;
        let lines = rows
            .iter()
            .map(cart::map_cart_line)
            .collect::<Result<Vec<_>, _>>()?;

        if lines.is_empty() {
            return Err(PlacementError::EmptyCart);
        }

        for line in &lines {
            let available = if line.is_active { line.stock_quantity } else { 0 };
            if available < line.quantity {
                return Err(PlacementError::InsufficientStock {
                    product_name: line.product_name.clone(),
                    requested: line.quantity,
                    available,
                });
            }
        }

        let quote_lines: Vec<QuoteLine> = lines
            .iter()
            .map(|line| QuoteLine {
                unit_price: line.unit_price,
                quantity: line.quantity,
            })
            .collect();
        let totals = pricing::quote(&quote_lines, request.tax_rate, request.shipping_rate);

        let row = sqlx::query(
            r"
            INSERT INTO orders (order_number, user_id, address_id, subtotal,
                                tax_amount, shipping_amount, total_amount,
                                payment_method, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, order_number, user_id, address_id, subtotal, tax_amount,
                      shipping_amount, total_amount, payment_method, payment_status,
                      order_status, tracking_number, notes, created_at, updated_at
            ",
        )
        .bind(order_number)
        .bind(request.user_id.as_i64())
        .bind(request.address_id.as_i64())
        .bind(totals.subtotal)
        .bind(totals.tax_amount)
        .bind(totals.shipping_amount)
        .bind(totals.total_amount)
        .bind(request.payment_method.as_str())
        .bind(&request.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "order number already exists"))?;

        let order = map_order(&row)?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            items.push(insert_item_and_consume_line(&mut tx, order.id, line).await?);
        }

        append_history(&mut tx, order.id, OrderStatus::Pending, Some(PLACED_NOTE)).await?;

        tx.commit().await?;

        Ok(PlacedOrder { order, items })
    }

    /// Move an order to a new status and append the history entry, in one
    /// transaction. The order row is locked for the duration so concurrent
    /// transitions serialize.
    ///
    /// # Errors
    ///
    /// Returns `TransitionError::OrderNotFound` or `IllegalTransition` per
    /// the state machine rules.
    #[instrument(skip(self, notes, tracking_number))]
    pub async fn transition_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        notes: Option<&str>,
        tracking_number: Option<&str>,
    ) -> Result<(Order, OrderStatusHistory), TransitionError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("{ORDER_COLUMNS_SQL} WHERE id = $1 FOR UPDATE"))
            .bind(order_id.as_i64())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(TransitionError::OrderNotFound)?;
        let current = map_order(&row).map_err(TransitionError::Repository)?;

        if !current.order_status.can_transition_to(new_status) {
            return Err(TransitionError::IllegalTransition {
                from: current.order_status,
                to: new_status,
            });
        }

        let row = sqlx::query(
            r"
            UPDATE orders
            SET order_status = $2,
                tracking_number = COALESCE($3, tracking_number),
                updated_at = now()
            WHERE id = $1
            RETURNING id, order_number, user_id, address_id, subtotal, tax_amount,
                      shipping_amount, total_amount, payment_method, payment_status,
                      order_status, tracking_number, notes, created_at, updated_at
            ",
        )
        .bind(order_id.as_i64())
        .bind(new_status.as_str())
        .bind(tracking_number)
        .fetch_one(&mut *tx)
        .await?;
        let updated = map_order(&row).map_err(TransitionError::Repository)?;

        let entry = append_history(&mut tx, order_id, new_status, notes)
            .await
            .map_err(TransitionError::Repository)?;

        tx.commit().await?;

        Ok((updated, entry))
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!("{ORDER_COLUMNS_SQL} WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(self.pool)
            .await?;

        row.map(|r| map_order(&r)).transpose()
    }

    /// Get an order only if it is owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_owned(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!(
            "{ORDER_COLUMNS_SQL} WHERE id = $1 AND user_id = $2"
        ))
        .bind(id.as_i64())
        .bind(user_id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        row.map(|r| map_order(&r)).transpose()
    }

    /// All orders for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "{ORDER_COLUMNS_SQL} WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.as_i64())
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(map_order).collect()
    }

    /// All orders, optionally filtered by status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "{ORDER_COLUMNS_SQL} WHERE order_status = $1 ORDER BY created_at DESC, id DESC"
                ))
                .bind(status.as_str())
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "{ORDER_COLUMNS_SQL} ORDER BY created_at DESC, id DESC"
                ))
                .fetch_all(self.pool)
                .await?
            }
        };

        rows.iter().map(map_order).collect()
    }

    /// Item snapshots for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT id, order_id, product_id, product_name, part_number,
                   quantity, unit_price, total_price
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(order_id.as_i64())
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(map_item).collect()
    }

    /// Status timeline for an order, in non-decreasing timestamp order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn timeline(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<OrderStatusHistory>, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT id, order_id, status, notes, created_at
            FROM order_status_history
            WHERE order_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(order_id.as_i64())
        .fetch_all(self.pool)
        .await?;

        rows.iter().map(map_history).collect()
    }
}

/// Snapshot one cart line as an order item, decrement the product's stock,
/// and delete the cart line. All three statements run on the caller's
/// transaction.
async fn insert_item_and_consume_line(
    tx: &mut Transaction<'_, Postgres>,
    order_id: OrderId,
    line: &CartLine,
) -> Result<OrderItem, PlacementError> {
    let row = sqlx::query(
        r"
        INSERT INTO order_items (order_id, product_id, product_name,
                                 part_number, quantity, unit_price, total_price)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, order_id, product_id, product_name, part_number,
                  quantity, unit_price, total_price
        ",
    )
    .bind(order_id.as_i64())
    .bind(line.product_id.as_i64())
    .bind(&line.product_name)
    .bind(&line.part_number)
    .bind(line.quantity)
    .bind(line.unit_price)
    .bind(line.line_total())
    .fetch_one(&mut **tx)
    .await?;
    let item = map_item(&row)?;

    // Conditional decrement: fails the transaction if a concurrent checkout
    // got there first or the product was deactivated.
    let decremented = sqlx::query(
        r"
        UPDATE products
        SET stock_quantity = stock_quantity - $2, updated_at = now()
        WHERE id = $1 AND is_active AND stock_quantity >= $2
        ",
    )
    .bind(line.product_id.as_i64())
    .bind(line.quantity)
    .execute(&mut **tx)
    .await?;

    if decremented.rows_affected() != 1 {
        return Err(PlacementError::StockConflict {
            product_name: line.product_name.clone(),
        });
    }

    let removed = sqlx::query("DELETE FROM cart_items WHERE id = $1")
        .bind(line.id.as_i64())
        .execute(&mut **tx)
        .await?;

    // The line vanished mid-checkout (e.g. a concurrent checkout for the
    // same user already consumed it). Abort rather than double-order.
    if removed.rows_affected() != 1 {
        return Err(PlacementError::StockConflict {
            product_name: line.product_name.clone(),
        });
    }

    Ok(item)
}

async fn append_history(
    tx: &mut Transaction<'_, Postgres>,
    order_id: OrderId,
    status: OrderStatus,
    notes: Option<&str>,
) -> Result<OrderStatusHistory, RepositoryError> {
    let row = sqlx::query(
        r"
        INSERT INTO order_status_history (order_id, status, notes)
        VALUES ($1, $2, $3)
        RETURNING id, order_id, status, notes, created_at
        ",
    )
    .bind(order_id.as_i64())
    .bind(status.as_str())
    .bind(notes)
    .fetch_one(&mut **tx)
    .await?;

    map_history(&row)
}

/// Generate an order number: `PREFIX-<UTC timestamp>-<6 char suffix>`.
///
/// The suffix keeps collisions rare; the unique constraint on
/// `orders.order_number` catches the rest.
fn generate_order_number(prefix: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%d%H%M%S");
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| {
            let idx = rng.random_range(0..SUFFIX_CHARSET.len());
            char::from(SUFFIX_CHARSET[idx])
        })
        .collect();

    format!("{prefix}-{timestamp}-{suffix}")
}

const ORDER_COLUMNS_SQL: &str = r"
    SELECT id, order_number, user_id, address_id, subtotal, tax_amount,
           shipping_amount, total_amount, payment_method, payment_status,
           order_status, tracking_number, notes, created_at, updated_at
    FROM orders
";

fn map_order(row: &PgRow) -> Result<Order, RepositoryError> {
    let payment_method: String = row.try_get("payment_method")?;
    let payment_status: String = row.try_get("payment_status")?;
    let order_status: String = row.try_get("order_status")?;

    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        order_number: row.try_get("order_number")?,
        user_id: UserId::new(row.try_get("user_id")?),
        address_id: AddressId::new(row.try_get("address_id")?),
        subtotal: row.try_get("subtotal")?,
        tax_amount: row.try_get("tax_amount")?,
        shipping_amount: row.try_get("shipping_amount")?,
        total_amount: row.try_get("total_amount")?,
        payment_method: PaymentMethod::from_str(&payment_method)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?,
        payment_status: PaymentStatus::from_str(&payment_status)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?,
        order_status: OrderStatus::from_str(&order_status)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?,
        tracking_number: row.try_get("tracking_number")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_item(row: &PgRow) -> Result<OrderItem, RepositoryError> {
    Ok(OrderItem {
        id: OrderItemId::new(row.try_get("id")?),
        order_id: OrderId::new(row.try_get("order_id")?),
        product_id: ProductId::new(row.try_get("product_id")?),
        product_name: row.try_get("product_name")?,
        part_number: row.try_get("part_number")?,
        quantity: row.try_get("quantity")?,
        unit_price: row.try_get("unit_price")?,
        total_price: row.try_get("total_price")?,
    })
}

fn map_history(row: &PgRow) -> Result<OrderStatusHistory, RepositoryError> {
    let status: String = row.try_get("status")?;

    Ok(OrderStatusHistory {
        id: StatusHistoryId::new(row.try_get("id")?),
        order_id: OrderId::new(row.try_get("order_id")?),
        status: OrderStatus::from_str(&status)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_format() {
        let number = generate_order_number("ASH");
        let parts: Vec<&str> = number.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ASH");
        assert_eq!(parts[1].len(), 14);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), SUFFIX_LEN);
        assert!(
            parts[2]
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_order_numbers_differ() {
        // Same timestamp second; suffixes must make these distinct.
        let a = generate_order_number("ASH");
        let b = generate_order_number("ASH");
        assert_ne!(a, b);
    }
}
