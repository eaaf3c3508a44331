//! Fulfillment: moving orders through their lifecycle.

use std::str::FromStr;

use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, instrument};

use sparehub_core::{OrderId, OrderStatus};

use crate::db::{OrderRepository, RepositoryError, TransitionError, UserRepository};
use crate::models::{Order, OrderStatusHistory};
use crate::services::notifications::NotificationService;

/// Errors surfaced when updating an order's status.
#[derive(Debug, Error)]
pub enum StatusUpdateError {
    /// The submitted status name is not one of the known statuses.
    #[error("unknown order status: {0}")]
    InvalidStatus(String),

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

impl From<TransitionError> for StatusUpdateError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::OrderNotFound => Self::OrderNotFound,
            TransitionError::IllegalTransition { from, to } => Self::IllegalTransition { from, to },
            TransitionError::Repository(e) => Self::Repository(e),
        }
    }
}

/// Status transition entry point for the fulfillment endpoints.
#[derive(Clone)]
pub struct FulfillmentService {
    pool: PgPool,
    notifications: NotificationService,
}

impl FulfillmentService {
    /// Create a new fulfillment service.
    #[must_use]
    pub fn new(pool: PgPool, notifications: NotificationService) -> Self {
        Self {
            pool,
            notifications,
        }
    }

    /// Move an order to `new_status`, record the history entry, and notify
    /// the customer.
    ///
    /// The notification runs asynchronously after the commit; a delivery
    /// failure never rolls the transition back.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStatus` for unknown status names, otherwise
    /// whatever the transition transaction reports.
    #[instrument(skip(self, notes, tracking_number))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        new_status: &str,
        notes: Option<&str>,
        tracking_number: Option<&str>,
    ) -> Result<(Order, OrderStatusHistory), StatusUpdateError> {
        let status = OrderStatus::from_str(new_status)
            .map_err(|_| StatusUpdateError::InvalidStatus(new_status.to_owned()))?;

        let (order, entry) = OrderRepository::new(&self.pool)
            .transition_status(order_id, status, notes, tracking_number)
            .await?;

        self.dispatch_notifications(&order, notes).await;

        Ok((order, entry))
    }

    async fn dispatch_notifications(&self, order: &Order, notes: Option<&str>) {
        let customer = match UserRepository::new(&self.pool).get_by_id(order.user_id).await {
            Ok(Some(customer)) => customer,
            Ok(None) => {
                error!(user_id = %order.user_id, "order owner vanished before notification");
                return;
            }
            Err(e) => {
                error!(error = %e, "failed to load customer for notification");
                return;
            }
        };

        let notifications = self.notifications.clone();
        let order = order.clone();
        let notes = notes.map(ToOwned::to_owned);
        tokio::spawn(async move {
            notifications
                .order_status_changed(&order, &customer, notes.as_deref())
                .await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_status_is_rejected_before_any_io() {
        let err = OrderStatus::from_str("returned").expect_err("not a status");
        assert_eq!(err.to_string(), "unknown order status: returned");
    }
}
