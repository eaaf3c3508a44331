//! Address book route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use sparehub_core::AddressId;

use crate::db::{AddressRepository, NewAddress};
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::models::Address;
use crate::state::AppState;

/// Body for creating an address.
#[derive(Debug, Deserialize)]
pub struct CreateAddressBody {
    pub full_name: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

/// GET /addresses - the caller's addresses, default first.
#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn index(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<Address>>> {
    let addresses = AddressRepository::new(state.pool())
        .list_for_user(user.0.id)
        .await?;

    Ok(Json(addresses))
}

/// POST /addresses - create an address, optionally making it the default.
#[instrument(skip(state, user, body), fields(user_id = %user.0.id))]
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<CreateAddressBody>,
) -> Result<(StatusCode, Json<Address>)> {
    for (field, value) in [
        ("full_name", &body.full_name),
        ("phone", &body.phone),
        ("address_line1", &body.address_line1),
        ("city", &body.city),
        ("state", &body.state),
        ("postal_code", &body.postal_code),
        ("country", &body.country),
    ] {
        if value.trim().is_empty() {
            return Err(AppError::BadRequest(format!("{field} must not be empty")));
        }
    }

    let created = AddressRepository::new(state.pool())
        .create(
            user.0.id,
            NewAddress {
                full_name: body.full_name,
                phone: body.phone,
                address_line1: body.address_line1,
                address_line2: body.address_line2,
                city: body.city,
                state: body.state,
                postal_code: body.postal_code,
                country: body.country,
                is_default: body.is_default,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /addresses/{id}/default - make an address the caller's default.
#[instrument(skip(state, user), fields(user_id = %user.0.id))]
pub async fn set_default(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<AddressId>,
) -> Result<Json<Value>> {
    AddressRepository::new(state.pool())
        .set_default(id, user.0.id)
        .await?;

    Ok(Json(json!({ "default": id })))
}
