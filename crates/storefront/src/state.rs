//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use crate::config::StorefrontConfig;
use crate::services::checkout::CheckoutService;
use crate::services::notifications::{NotificationService, SmtpMailer, WebPushClient};
use crate::services::orders::FulfillmentService;

/// Errors wiring the shared application state together.
#[derive(Debug, Error)]
pub enum StateError {
    /// The SMTP transport could not be constructed.
    #[error("SMTP transport setup failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// The configured VAPID private key is unusable.
    #[error("VAPID key rejected: {0}")]
    Vapid(#[from] web_push::WebPushError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and the service layer.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    checkout: CheckoutService,
    fulfillment: FulfillmentService,
}

impl AppState {
    /// Create a new application state, wiring the service layer together.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP transport cannot be constructed or the
    /// VAPID signing key does not parse.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let mailer = Arc::new(SmtpMailer::new(&config.email)?);
        let push = Arc::new(WebPushClient::new(&config.push)?);
        let notifications = NotificationService::new(
            pool.clone(),
            mailer,
            push,
            config.admin_email.clone(),
        );

        let checkout = CheckoutService::new(
            pool.clone(),
            notifications.clone(),
            config.tax_rate,
            config.shipping_rate,
            config.order_number_prefix.clone(),
        );
        let fulfillment = FulfillmentService::new(pool.clone(), notifications);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                checkout,
                fulfillment,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the checkout service.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    /// Get a reference to the fulfillment service.
    #[must_use]
    pub fn fulfillment(&self) -> &FulfillmentService {
        &self.inner.fulfillment
    }
}
