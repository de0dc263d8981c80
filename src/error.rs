// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// A `(category, subtype)` pair with no configured emission factor.
///
/// This is a data defect: callers must abort rather than fall back to a
/// default factor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No emission factor for category '{category}', subtype '{subtype}'")]
pub struct FactorNotFoundError {
    pub category: String,
    pub subtype: String,
}

/// Rejected user submission. Nothing is persisted when one of these occurs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Subtype must be between 1 and 64 characters")]
    InvalidSubtype,

    #[error("Quantity is required for this category")]
    MissingQuantity,

    #[error("Quantity must be a number greater than zero (got {0})")]
    NonPositiveQuantity(f64),

    #[error("Quantity must be a non-negative number (got {0})")]
    NegativeQuantity(f64),

    #[error("Quantity {0} is too large to record")]
    QuantityTooLarge(f64),

    #[error("Date is required")]
    MissingDate,

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("{0}")]
    Field(String),
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    FactorNotFound(#[from] FactorNotFoundError),

    #[error("Unable to load activity data: {0}")]
    SourceUnavailable(String),

    #[error("News feed is not configured")]
    NewsUnavailable,

    #[error("News API error: {0}")]
    NewsApi(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    /// Status code and machine-readable error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::FactorNotFound(_) => (StatusCode::UNPROCESSABLE_ENTITY, "unknown_factor"),
            AppError::SourceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "source_unavailable")
            }
            AppError::NewsUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "news_unavailable"),
            AppError::NewsApi(_) => (StatusCode::BAD_GATEWAY, "news_error"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_code();

        let details = match &self {
            AppError::NotFound(msg) | AppError::BadRequest(msg) | AppError::NewsApi(msg) => {
                Some(msg.clone())
            }
            AppError::Validation(err) => Some(err.to_string()),
            AppError::FactorNotFound(err) => {
                tracing::warn!(
                    category = %err.category,
                    subtype = %err.subtype,
                    "Emission factor lookup failed"
                );
                Some(err.to_string())
            }
            AppError::SourceUnavailable(reason) => {
                tracing::warn!(reason = %reason, "Activity data unavailable");
                Some("Unable to load activity data".to_string())
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                None
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                None
            }
            AppError::Unauthorized | AppError::InvalidToken | AppError::NewsUnavailable => None,
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
