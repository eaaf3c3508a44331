//! Customer order history route handlers.
//!
//! Every read here is ownership-scoped; another user's order ID yields a
//! plain 404 rather than a 403, so IDs don't leak.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use sparehub_core::OrderId;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{Order, OrderItem, OrderStatusHistory};
use crate::state::AppState;

/// One order with its item snapshots.
#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// GET /orders - the caller's order history, newest first.
#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn index(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.0.id)
        .await?;

    Ok(Json(orders))
}

/// GET /orders/{id} - one of the caller's orders with items.
#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn show(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let repo = OrderRepository::new(state.pool());

    let order = repo
        .get_owned(id, user.0.id)
        .await?
        .ok_or_else(|| AppError::NotFound("order".to_string()))?;
    let items = repo.items_for_order(order.id).await?;

    Ok(Json(OrderDetail { order, items }))
}

/// GET /orders/{id}/timeline - status history, oldest first.
#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn timeline(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<OrderId>,
) -> Result<Json<Vec<OrderStatusHistory>>> {
    let repo = OrderRepository::new(state.pool());

    let order = repo
        .get_owned(id, user.0.id)
        .await?
        .ok_or_else(|| AppError::NotFound("order".to_string()))?;
    let entries = repo.timeline(order.id).await?;

    Ok(Json(entries))
}
