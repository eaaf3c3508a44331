//! Cart route handlers.
//!
//! Add and update are stock-checked against the live catalog so a cart can
//! never hold more of a product than the shelf does at the time of the
//! request. Placement re-validates under its own transaction regardless.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use sparehub_core::ProductId;

use crate::db::{CartRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::{CartView, Product};
use crate::services::pricing::{self, QuoteLine};
use crate::state::AppState;

/// Body for add and update operations.
#[derive(Debug, Deserialize)]
pub struct CartLineBody {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Body for remove.
#[derive(Debug, Deserialize)]
pub struct RemoveBody {
    pub product_id: ProductId,
}

/// Response for add/update, mirroring what the cart badge needs.
#[derive(Debug, Serialize)]
pub struct CartLineResponse {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// GET /cart - cart contents with quoted totals.
#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn show(State(state): State<AppState>, user: CurrentUser) -> Result<Json<CartView>> {
    let lines = CartRepository::new(state.pool())
        .lines_for_user(user.0.id)
        .await?;

    let quote_lines: Vec<QuoteLine> = lines
        .iter()
        .map(|line| QuoteLine {
            unit_price: line.unit_price,
            quantity: line.quantity,
        })
        .collect();
    let totals = pricing::quote(
        &quote_lines,
        state.config().tax_rate,
        state.config().shipping_rate,
    );

    Ok(Json(CartView { lines, totals }))
}

/// POST /cart/add - add a product, incrementing any existing line.
#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn add(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CartLineBody>,
) -> Result<Json<CartLineResponse>> {
    let requested = positive_quantity(body.quantity)?;
    let product = active_product(&state, body.product_id).await?;

    let cart = CartRepository::new(state.pool());
    let in_cart = cart
        .quantity_of(user.0.id, body.product_id)
        .await?
        .unwrap_or(0);
    ensure_stock_covers(&product, in_cart + requested)?;

    let quantity = cart.add_line(user.0.id, body.product_id, requested).await?;

    Ok(Json(CartLineResponse {
        product_id: body.product_id,
        quantity,
    }))
}

/// POST /cart/update - set an existing line's quantity.
#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CartLineBody>,
) -> Result<Json<CartLineResponse>> {
    let quantity = positive_quantity(body.quantity)?;
    let product = active_product(&state, body.product_id).await?;
    ensure_stock_covers(&product, quantity)?;

    CartRepository::new(state.pool())
        .set_quantity(user.0.id, body.product_id, quantity)
        .await?;

    Ok(Json(CartLineResponse {
        product_id: body.product_id,
        quantity,
    }))
}

/// POST /cart/remove - drop a line.
#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<RemoveBody>,
) -> Result<Json<Value>> {
    let removed = CartRepository::new(state.pool())
        .remove_line(user.0.id, body.product_id)
        .await?;
    if !removed {
        return Err(AppError::NotFound("cart line".to_string()));
    }

    Ok(Json(json!({ "removed": true })))
}

/// GET /cart/count - number of distinct lines.
#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn count(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Value>> {
    let count = CartRepository::new(state.pool())
        .line_count(user.0.id)
        .await?;

    Ok(Json(json!({ "count": count })))
}

fn positive_quantity(quantity: i32) -> Result<i32> {
    if quantity < 1 {
        return Err(AppError::BadRequest(
            "quantity must be at least 1".to_string(),
        ));
    }
    Ok(quantity)
}

async fn active_product(state: &AppState, id: ProductId) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get_active(id)
        .await?
        .ok_or_else(|| AppError::NotFound("product".to_string()))
}

fn ensure_stock_covers(product: &Product, wanted: i32) -> Result<()> {
    if wanted > product.stock_quantity {
        return Err(AppError::BadRequest(format!(
            "only {} of {} in stock",
            product.stock_quantity, product.name
        )));
    }
    Ok(())
}
