//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding. All route handlers return `Result<T, AppError>` and
//! clients always receive a JSON `{"error": ...}` body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::checkout::CheckoutError;
use crate::services::orders::StatusUpdateError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),

    /// Checkout failed.
    #[error("checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Status update failed.
    #[error("status update error: {0}")]
    StatusUpdate(#[from] StatusUpdateError),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Request lacks a valid identity.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Identity is valid but not allowed here.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn is_server_error(&self) -> bool {
        match self {
            Self::Internal(_) => true,
            Self::Database(e) => matches!(
                e,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_)
            ),
            // Conflicts are retryable client outcomes wherever they surface.
            Self::Checkout(CheckoutError::Repository(e))
            | Self::StatusUpdate(StatusUpdateError::Repository(e)) => {
                !matches!(e, RepositoryError::Conflict(_))
            }
            _ => false,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Database(e) => match e {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Checkout(e) => match e {
                CheckoutError::EmptyCart | CheckoutError::InvalidAddress => {
                    StatusCode::BAD_REQUEST
                }
                CheckoutError::InsufficientStock { .. } | CheckoutError::StockConflict { .. } => {
                    StatusCode::CONFLICT
                }
                CheckoutError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
                CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::StatusUpdate(e) => match e {
                StatusUpdateError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
                StatusUpdateError::OrderNotFound => StatusCode::NOT_FOUND,
                StatusUpdateError::IllegalTransition { .. } => StatusCode::CONFLICT,
                StatusUpdateError::Repository(RepositoryError::Conflict(_)) => {
                    StatusCode::CONFLICT
                }
                StatusUpdateError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to the client.
    fn client_message(&self) -> String {
        if self.is_server_error() {
            return "internal server error".to_string();
        }
        match self {
            Self::Checkout(e) => e.to_string(),
            Self::StatusUpdate(e) => e.to_string(),
            Self::Database(e) => e.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "request error"
            );
        }

        let status = self.status_code();
        let body = Json(json!({ "error": self.client_message() }));

        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_client_error_status_codes() {
        assert_eq!(
            status_of(AppError::NotFound("order".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Unauthorized("no identity".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Forbidden("admins only".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AppError::BadRequest("bad".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_checkout_errors_map_to_conflict_or_bad_request() {
        assert_eq!(
            status_of(AppError::Checkout(CheckoutError::EmptyCart)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Checkout(CheckoutError::InsufficientStock {
                product_name: "Brake Pad".into(),
                requested: 5,
                available: 2,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Checkout(CheckoutError::StockConflict {
                product_name: "Brake Pad".into(),
            })),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_illegal_transition_maps_to_conflict() {
        use sparehub_core::OrderStatus;

        assert_eq!(
            status_of(AppError::StatusUpdate(
                StatusUpdateError::IllegalTransition {
                    from: OrderStatus::Delivered,
                    to: OrderStatus::Pending,
                }
            )),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::StatusUpdate(StatusUpdateError::InvalidStatus(
                "returned".into()
            ))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_conflict_surfacing_through_checkout_stays_a_conflict() {
        let make = || {
            AppError::Checkout(CheckoutError::Repository(RepositoryError::Conflict(
                "order number already exists".into(),
            )))
        };

        assert_eq!(status_of(make()), StatusCode::CONFLICT);
        assert!(make().client_message().contains("order number"));
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let err = AppError::Internal("pool exhausted at 10.0.0.3".into());
        assert_eq!(err.client_message(), "internal server error");
    }
}
