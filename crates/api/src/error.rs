//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fulfillment::FulfillmentError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Fulfillment engine error.
    Fulfillment(FulfillmentError),
    /// Store error from plain CRUD reads/writes.
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        metrics::counter!("api_error_responses_total").increment(1);
        let (status, body) = match self {
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::Fulfillment(err) => fulfillment_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
        };
        (status, axum::Json(body)).into_response()
    }
}

fn fulfillment_error_to_response(err: FulfillmentError) -> (StatusCode, serde_json::Value) {
    let status = match &err {
        FulfillmentError::InvalidQuantity(_) | FulfillmentError::SubtotalOverflow { .. } => {
            StatusCode::BAD_REQUEST
        }
        FulfillmentError::InvalidOrder(_)
        | FulfillmentError::InvalidProduct(_)
        | FulfillmentError::ItemNotFound(_) => StatusCode::NOT_FOUND,
        FulfillmentError::InsufficientStock { available, .. } => {
            return (
                StatusCode::CONFLICT,
                serde_json::json!({ "error": err.to_string(), "available": available }),
            );
        }
        FulfillmentError::ConcurrentModification => StatusCode::CONFLICT,
        FulfillmentError::TransientStore(_) => StatusCode::SERVICE_UNAVAILABLE,
        FulfillmentError::OrderVanished(_) | FulfillmentError::Store(_) => {
            tracing::error!(error = %err, "internal fulfillment error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, serde_json::json!({ "error": err.to_string() }))
}

fn store_error_to_response(err: StoreError) -> (StatusCode, serde_json::Value) {
    let status = match &err {
        StoreError::RowNotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::AlreadyExists { .. } | StoreError::ConcurrencyConflict { .. } => {
            StatusCode::CONFLICT
        }
        StoreError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => {
            tracing::error!(error = %err, "internal store error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, serde_json::json!({ "error": err.to_string() }))
}

impl From<FulfillmentError> for ApiError {
    fn from(err: FulfillmentError) -> Self {
        ApiError::Fulfillment(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
