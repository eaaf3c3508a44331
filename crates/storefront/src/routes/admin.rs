//! Admin order management route handlers.
//!
//! All routes here require the admin role; the [`AdminUser`] extractor
//! rejects everyone else before the handler body runs.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use sparehub_core::OrderId;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::AdminUser;
use crate::models::{Order, OrderItem, OrderStatusHistory};
use crate::services::orders::StatusUpdateError;
use crate::state::AppState;

/// Query parameters for the order list.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

/// Body for a status transition.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
}

/// One order with its items and full timeline, as shown in the dashboard.
#[derive(Debug, Serialize)]
pub struct AdminOrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub timeline: Vec<OrderStatusHistory>,
}

/// Result of a transition: the updated order plus the new history entry.
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    #[serde(flatten)]
    pub order: Order,
    pub history_entry: OrderStatusHistory,
}

/// GET /admin/orders - all orders, optionally filtered by status.
#[instrument(skip(state, admin), fields(admin_id = %admin.0.id))]
pub async fn index(
    State(state): State<AppState>,
    admin: AdminUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Order>>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse)
        .transpose()
        .map_err(|_| {
            StatusUpdateError::InvalidStatus(query.status.clone().unwrap_or_default())
        })?;

    let orders = OrderRepository::new(state.pool()).list_all(status).await?;

    Ok(Json(orders))
}

/// GET /admin/orders/{id} - one order with items and timeline.
#[instrument(skip(state, admin), fields(admin_id = %admin.0.id))]
pub async fn show(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<OrderId>,
) -> Result<Json<AdminOrderDetail>> {
    let repo = OrderRepository::new(state.pool());

    let order = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("order".to_string()))?;
    let items = repo.items_for_order(order.id).await?;
    let timeline = repo.timeline(order.id).await?;

    Ok(Json(AdminOrderDetail {
        order,
        items,
        timeline,
    }))
}

/// POST /admin/orders/{id}/status - move an order through its lifecycle.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.0.id))]
pub async fn update_status(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<OrderId>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<TransitionResponse>> {
    let (order, history_entry) = state
        .fulfillment()
        .update_status(
            id,
            &body.status,
            body.notes.as_deref(),
            body.tracking_number.as_deref(),
        )
        .await?;

    Ok(Json(TransitionResponse {
        order,
        history_entry,
    }))
}
