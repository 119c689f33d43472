//! Unified error handling with Sentry integration.
//!
//! Provides a unified `ApiError` type that captures server faults to Sentry
//! before responding. All route handlers return `Result<T, ApiError>`.
//!
//! Every error body has the same wire shape:
//! `{"success": false, "message": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::{CancelOrderError, CreateOrderError, RepositoryError};
use crate::services::auth::AuthError;
use crate::stripe::StripeError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Stripe API operation failed.
    #[error("Stripe error: {0}")]
    Stripe(#[from] StripeError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request payload failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Requested quantity exceeds available stock.
    #[error("{0}")]
    InsufficientStock(String),

    /// State machine rejected the requested transition.
    #[error("{0}")]
    InvalidState(String),

    /// Webhook payload failed signature verification.
    #[error("Unverified: {0}")]
    Unverified(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthenticated(String),

    /// Caller is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Uniqueness conflict (duplicate email, SKU, ...).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource not found".to_string()),
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::Database(other),
        }
    }
}

impl From<CreateOrderError> for ApiError {
    fn from(err: CreateOrderError) -> Self {
        match err {
            CreateOrderError::Empty => Self::InvalidInput("order has no items".to_string()),
            CreateOrderError::ProductUnavailable(id) => {
                Self::NotFound(format!("product {id} is unavailable"))
            }
            insufficient @ CreateOrderError::InsufficientStock { .. } => {
                Self::InsufficientStock(insufficient.to_string())
            }
            too_large @ CreateOrderError::QuantityTooLarge(_) => {
                Self::InvalidInput(too_large.to_string())
            }
            CreateOrderError::Repository(inner) => inner.into(),
        }
    }
}

impl From<CancelOrderError> for ApiError {
    fn from(err: CancelOrderError) -> Self {
        match err {
            CancelOrderError::NotFound => Self::NotFound("order not found".to_string()),
            not_cancellable @ CancelOrderError::NotCancellable(_) => {
                Self::InvalidState(not_cancellable.to_string())
            }
            CancelOrderError::Repository(inner) => inner.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Capture server faults to Sentry; client errors are just noise there
        if matches!(self, Self::Database(_) | Self::Internal(_) | Self::Stripe(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Stripe(_) => StatusCode::BAD_GATEWAY,
            Self::Auth(err) => err.status_code(),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidInput(_)
            | Self::InsufficientStock(_)
            | Self::InvalidState(_)
            | Self::Unverified(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Stripe(_) => "Payment service error".to_string(),
            Self::Auth(err) => err.public_message(),
            other => other.to_string(),
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

/// Result type alias for `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Set the Sentry user context after successful authentication.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_of(ApiError::NotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::Unauthenticated("x".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(ApiError::Forbidden("x".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ApiError::Conflict("x".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(ApiError::InsufficientStock("x".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::Internal("x".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let err = ApiError::Internal("connection pool exhausted".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // The body must carry the generic message, not the detail; the
        // detail goes to Sentry and the log instead.
    }

    #[test]
    fn test_repository_not_found_maps_to_404() {
        let err: ApiError = RepositoryError::NotFound.into();
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_quantity_overflow_maps_to_400() {
        let err: ApiError =
            CreateOrderError::QuantityTooLarge(pomelo_core::ProductId::new(1)).into();
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_duplicate_sku_maps_to_422() {
        let err: ApiError = RepositoryError::Conflict("sku already exists".to_string()).into();
        assert_eq!(status_of(err), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
