//! Database access for the storefront `PostgreSQL`.
//!
//! One repository per table, all using the runtime sqlx query API with
//! explicit binds and row mapping. Transactions are explicit `begin()`
//! scopes owned by the repository method that needs atomicity; no network
//! I/O ever happens inside one.
//!
//! ## Tables
//!
//! - `users` - Consumed identity (recipients, admin set)
//! - `products` - Catalog facts: price, discount, stock
//! - `cart_items` - One line per (user, product)
//! - `addresses` - Shipping destinations
//! - `orders` / `order_items` / `order_status_history`
//! - `push_subscriptions` - Web Push endpoints per user device
//!
//! # Migrations
//!
//! Migrations live in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p sparehub-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod addresses;
pub mod cart;
pub mod orders;
pub mod products;
pub mod push_subscriptions;
pub mod users;

pub use addresses::{AddressRepository, NewAddress};
pub use cart::CartRepository;
pub use orders::{OrderRepository, PlacementError, PlacementRequest, TransitionError};
pub use products::ProductRepository;
pub use push_subscriptions::PushSubscriptionRepository;
pub use users::UserRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The requested row does not exist.
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value could not be interpreted.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl RepositoryError {
    /// Translate a sqlx error, mapping unique violations to `Conflict`.
    pub(crate) fn from_sqlx(e: sqlx::Error, conflict_message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(conflict_message.to_owned());
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
