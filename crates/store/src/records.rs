//! Persisted record types.
//!
//! Plain rows as stored. Derived fields (`OrderRecord::total`,
//! `OrderItemRecord::subtotal`) are only ever written by the fulfillment
//! engine, never by callers.

use chrono::{DateTime, Utc};
use common::{CustomerId, Money, OrderId, OrderItemId, OrderState, ProductId};
use serde::{Deserialize, Serialize};

/// A catalog product. `stock` is mutated only through the inventory ledger
/// once orders reference the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    /// Unit price; positive.
    pub price: Money,
    /// Units on hand; never negative.
    pub stock: i64,
}

/// An order header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub placed_at: DateTime<Utc>,
    pub state: OrderState,
    /// Sum of the order's item subtotals. Derived.
    pub total: Money,
    /// Optimistic concurrency token, bumped on every order-field update.
    pub row_version: i64,
}

impl OrderRecord {
    /// Creates a fresh pending order with a zero total.
    pub fn new(customer_id: CustomerId, placed_at: DateTime<Utc>) -> Self {
        Self {
            id: OrderId::new(),
            customer_id,
            placed_at,
            state: OrderState::Pending,
            total: Money::zero(),
            row_version: 0,
        }
    }
}

/// A line item row. `subtotal == price * quantity` as of the item's last
/// successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRecord {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub subtotal: Money,
}
