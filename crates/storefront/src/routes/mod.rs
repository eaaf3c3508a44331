//! HTTP route handlers for the storefront JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (pings the database)
//!
//! # Cart (requires identity)
//! GET  /cart                        - Cart contents with quoted totals
//! POST /cart/add                    - Add a product (upsert-increment)
//! POST /cart/update                 - Set a line's quantity
//! POST /cart/remove                 - Remove a line
//! GET  /cart/count                  - Number of distinct lines
//!
//! # Checkout
//! POST /checkout                    - Place an order from the cart
//!
//! # Orders (customer's own)
//! GET  /orders                      - Order history, newest first
//! GET  /orders/{id}                 - One order with item snapshots
//! GET  /orders/{id}/timeline        - Status history, oldest first
//!
//! # Addresses
//! GET  /addresses                   - Address book, default first
//! POST /addresses                   - Create an address
//! POST /addresses/{id}/default      - Make an address the default
//!
//! # Push notifications
//! GET  /notifications/vapid-public-key - Key for browser subscription
//! POST /notifications/subscribe     - Register a device endpoint
//! POST /notifications/unsubscribe   - Remove a device endpoint
//!
//! # Admin (requires role admin)
//! GET  /admin/orders                - All orders, optional ?status= filter
//! GET  /admin/orders/{id}           - One order with items and timeline
//! POST /admin/orders/{id}/status    - Transition the order's status
//! ```

pub mod addresses;
pub mod admin;
pub mod cart;
pub mod checkout;
pub mod notifications;
pub mod orders;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Liveness check: the process is up. Does not touch dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness check: pings the database, `503` when it is unreachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the order routes router (customer-facing).
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/timeline", get(orders::timeline))
}

/// Create the address book routes router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(addresses::index).post(addresses::create))
        .route("/{id}/default", post(addresses::set_default))
}

/// Create the push notification routes router.
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/vapid-public-key", get(notifications::vapid_public_key))
        .route("/subscribe", post(notifications::subscribe))
        .route("/unsubscribe", post(notifications::unsubscribe))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(admin::index))
        .route("/orders/{id}", get(admin::show))
        .route("/orders/{id}/status", post(admin::update_status))
}

/// Assemble the full application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/cart", cart_routes())
        .route("/checkout", post(checkout::place_order))
        .nest("/orders", order_routes())
        .nest("/addresses", address_routes())
        .nest("/notifications", notification_routes())
        .nest("/admin", admin_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness_answers_without_dependencies() {
        assert_eq!(health().await, "ok");
    }
}
