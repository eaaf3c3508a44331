//! Checkout route handler.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use sparehub_core::{AddressId, PaymentMethod};

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::PlacedOrder;
use crate::services::checkout::CheckoutRequest;
use crate::state::AppState;

/// Body for placing an order.
#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub address_id: AddressId,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
}

/// POST /checkout - convert the cart into an order.
#[instrument(skip(state, user, body), fields(user_id = %user.0.id))]
pub async fn place_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CheckoutBody>,
) -> Result<(StatusCode, Json<PlacedOrder>)> {
    let placed = state
        .checkout()
        .place_order(
            user.0.id,
            CheckoutRequest {
                address_id: body.address_id,
                payment_method: body.payment_method,
                notes: body.notes,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(placed)))
}
