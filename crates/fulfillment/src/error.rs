//! Fulfillment error taxonomy.
//!
//! Validation errors are raised before any transaction opens and never
//! mutate state; business-rule and infrastructure errors inside a
//! transaction always roll it back before surfacing here.

use common::{Money, OrderId, OrderItemId, ProductId};
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the fulfillment coordinator.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// The order id does not reference an existing order.
    #[error("order not found: {0}")]
    InvalidOrder(OrderId),

    /// The product id does not reference an existing product.
    #[error("product not found: {0}")]
    InvalidProduct(ProductId),

    /// Quantity must be at least 1.
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(i64),

    /// The line item to edit does not exist.
    #[error("order item not found: {0}")]
    ItemNotFound(OrderItemId),

    /// The product does not have enough stock to cover the request.
    /// `available` is the actual stock read under lock, so the caller can
    /// offer a corrected quantity.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// `price * quantity` does not fit in 64-bit cents. The request is
    /// rejected before any row is written.
    #[error(
        "subtotal overflow for product {product_id}: price {price} times quantity {quantity}"
    )]
    SubtotalOverflow {
        product_id: ProductId,
        price: Money,
        quantity: i64,
    },

    /// The order row vanished between the item mutation and the total
    /// recompute. Should not happen inside one transaction.
    #[error("order {0} disappeared during total recompute")]
    OrderVanished(OrderId),

    /// A concurrent writer changed the row first. Reload and retry.
    #[error("concurrent modification, reload and retry")]
    ConcurrentModification,

    /// The store reported a lock-wait timeout or deadlock; the transaction
    /// was rolled back and the operation may be retried.
    #[error("transient store failure: {0}")]
    TransientStore(String),

    /// Any other store failure.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for FulfillmentError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConcurrencyConflict { .. } => FulfillmentError::ConcurrentModification,
            StoreError::Transient(inner) => FulfillmentError::TransientStore(inner.to_string()),
            other => FulfillmentError::Store(other),
        }
    }
}

impl FulfillmentError {
    /// Returns true if the caller may retry the operation against fresh
    /// state.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FulfillmentError::ConcurrentModification | FulfillmentError::TransientStore(_)
        )
    }
}

/// Result type for fulfillment operations.
pub type Result<T> = std::result::Result<T, FulfillmentError>;
