//! Checkout orchestration: validate the shipping address, run the
//! placement transaction, then kick off notifications.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, instrument};

use sparehub_core::{AddressId, PaymentMethod, UserId};

use crate::db::{
    AddressRepository, OrderRepository, PlacementError, PlacementRequest, RepositoryError,
    UserRepository,
};
use crate::models::PlacedOrder;
use crate::services::notifications::NotificationService;

/// What the customer submits to place an order.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub address_id: AddressId,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// Errors surfaced by checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart holds no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// The shipping address doesn't exist or belongs to another user.
    #[error("address not found")]
    InvalidAddress,

    /// A product cannot cover the requested quantity.
    #[error("insufficient stock for {product_name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_name: String,
        requested: i32,
        available: i32,
    },

    /// A concurrent checkout consumed the stock first; the client should
    /// refresh the cart and retry.
    #[error("stock changed during checkout for {product_name}")]
    StockConflict { product_name: String },

    /// Underlying repository failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<PlacementError> for CheckoutError {
    fn from(e: PlacementError) -> Self {
        match e {
            PlacementError::EmptyCart => Self::EmptyCart,
            PlacementError::InsufficientStock {
                product_name,
                requested,
                available,
            } => Self::InsufficientStock {
                product_name,
                requested,
                available,
            },
            PlacementError::StockConflict { product_name } => Self::StockConflict { product_name },
            PlacementError::Repository(e) => Self::Repository(e),
        }
    }
}

/// Order placement entry point; shared by all request handlers.
#[derive(Clone)]
pub struct CheckoutService {
    pool: PgPool,
    notifications: NotificationService,
    tax_rate: Decimal,
    shipping_rate: Decimal,
    order_number_prefix: String,
}

impl CheckoutService {
    /// Create a new checkout service.
    #[must_use]
    pub fn new(
        pool: PgPool,
        notifications: NotificationService,
        tax_rate: Decimal,
        shipping_rate: Decimal,
        order_number_prefix: String,
    ) -> Self {
        Self {
            pool,
            notifications,
            tax_rate,
            shipping_rate,
            order_number_prefix,
        }
    }

    /// Place an order from the user's current cart.
    ///
    /// The placement itself is atomic; confirmation email and push fan-out
    /// happen asynchronously after the commit and never affect the result.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::InvalidAddress`] before touching the cart;
    /// otherwise whatever the placement transaction reports.
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        request: CheckoutRequest,
    ) -> Result<PlacedOrder, CheckoutError> {
        AddressRepository::new(&self.pool)
            .get_owned(request.address_id, user_id)
            .await?
            .ok_or(CheckoutError::InvalidAddress)?;

        let placed = OrderRepository::new(&self.pool)
            .place_order(&PlacementRequest {
                user_id,
                address_id: request.address_id,
                payment_method: request.payment_method,
                notes: request.notes,
                tax_rate: self.tax_rate,
                shipping_rate: self.shipping_rate,
                order_number_prefix: self.order_number_prefix.clone(),
            })
            .await?;

        self.dispatch_notifications(&placed).await;

        Ok(placed)
    }

    /// Spawn the post-commit notification fan-out. The customer row is
    /// loaded here so the spawned task owns everything it needs.
    async fn dispatch_notifications(&self, placed: &PlacedOrder) {
        let customer = match UserRepository::new(&self.pool)
            .get_by_id(placed.order.user_id)
            .await
        {
            Ok(Some(customer)) => customer,
            Ok(None) => {
                error!(user_id = %placed.order.user_id, "order owner vanished before notification");
                return;
            }
            Err(e) => {
                error!(error = %e, "failed to load customer for notification");
                return;
            }
        };

        let notifications = self.notifications.clone();
        let placed = placed.clone();
        tokio::spawn(async move {
            notifications.order_placed(&placed, &customer).await;
        });
    }
}
