//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SPAREHUB_DATABASE_URL` - `PostgreSQL` connection string
//! - `SPAREHUB_ADMIN_EMAIL` - Inbox for new-order alerts
//! - `SMTP_HOST` - SMTP server hostname
//! - `SMTP_USERNAME` - SMTP authentication username
//! - `SMTP_PASSWORD` - SMTP authentication password
//! - `SMTP_FROM_ADDRESS` - Sender address for transactional email
//! - `VAPID_PUBLIC_KEY` - Web Push VAPID public key
//! - `VAPID_PRIVATE_KEY` - Web Push VAPID private key
//! - `VAPID_SUBJECT` - VAPID subject claim (mailto: URL)
//!
//! ## Optional
//! - `SPAREHUB_HOST` - Bind address (default: 127.0.0.1)
//! - `SPAREHUB_PORT` - Listen port (default: 3000)
//! - `SPAREHUB_TAX_RATE` - Fractional tax rate (default: 0.18)
//! - `SPAREHUB_SHIPPING_RATE` - Flat shipping charge (default: 50)
//! - `SPAREHUB_ORDER_PREFIX` - Order number prefix (default: ASH)
//! - `SMTP_PORT` - SMTP server port (default: 587)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Fractional tax rate applied to the order subtotal
    pub tax_rate: Decimal,
    /// Flat shipping charge per order
    pub shipping_rate: Decimal,
    /// Prefix for generated order numbers
    pub order_number_prefix: String,
    /// Inbox that receives new-order alert emails
    pub admin_email: String,
    /// SMTP delivery configuration
    pub email: EmailConfig,
    /// Web Push configuration
    pub push: PushConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
}

/// SMTP delivery configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Web Push (VAPID) configuration.
///
/// Implements `Debug` manually to redact the private key.
#[derive(Clone)]
pub struct PushConfig {
    /// VAPID public key, also served to browsers at subscription time
    pub vapid_public_key: String,
    /// VAPID private signing key
    pub vapid_private_key: SecretString,
    /// VAPID subject claim (mailto: URL)
    pub vapid_subject: String,
}

impl std::fmt::Debug for PushConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushConfig")
            .field("vapid_public_key", &self.vapid_public_key)
            .field("vapid_private_key", &"[REDACTED]")
            .field("vapid_subject", &self.vapid_subject)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SPAREHUB_DATABASE_URL")?;
        let host = parse_env_or_default::<IpAddr>("SPAREHUB_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("SPAREHUB_PORT", "3000")?;
        let tax_rate = parse_env_or_default::<Decimal>("SPAREHUB_TAX_RATE", "0.18")?;
        let shipping_rate = parse_env_or_default::<Decimal>("SPAREHUB_SHIPPING_RATE", "50")?;
        let order_number_prefix = get_env_or_default("SPAREHUB_ORDER_PREFIX", "ASH");
        let admin_email = get_required_env("SPAREHUB_ADMIN_EMAIL")?;

        let email = EmailConfig::from_env()?;
        let push = PushConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            database_url,
            host,
            port,
            tax_rate,
            shipping_rate,
            order_number_prefix,
            admin_email,
            email,
            push,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            smtp_host: get_required_env("SMTP_HOST")?,
            smtp_port: parse_env_or_default::<u16>("SMTP_PORT", "587")?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_required_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM_ADDRESS")?,
        })
    }
}

impl PushConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            vapid_public_key: get_required_env("VAPID_PUBLIC_KEY")?,
            vapid_private_key: get_required_secret("VAPID_PRIVATE_KEY")?,
            vapid_subject: get_required_env("VAPID_SUBJECT")?,
        })
    }
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable (or its default) parsed into `T`.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_rates_parse() {
        assert_eq!("0.18".parse::<Decimal>().unwrap(), dec!(0.18));
        assert_eq!("50".parse::<Decimal>().unwrap(), dec!(50));
    }

    #[test]
    fn test_email_config_debug_redacts_password() {
        let config = EmailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("hunter2"),
            from_address: "orders@example.com".to_string(),
        };

        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_push_config_debug_redacts_private_key() {
        let config = PushConfig {
            vapid_public_key: "pub".to_string(),
            vapid_private_key: SecretString::from("priv-key-material"),
            vapid_subject: "mailto:ops@example.com".to_string(),
        };

        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("priv-key-material"));
    }
}
