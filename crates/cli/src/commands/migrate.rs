//! Database migration command.
//!
//! Migration files live in `crates/storefront/migrations/` and are embedded
//! into this binary at compile time, so the CLI can migrate any reachable
//! database without a source checkout.

use super::{CommandError, connect};

/// Run the storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    tracing::info!("Connecting to storefront database...");
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
