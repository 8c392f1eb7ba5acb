//! Order-fulfillment consistency engine.
//!
//! Keeps `product.stock`, `order_item.subtotal`, and `order.total` mutually
//! consistent while line items are created, edited, and deleted:
//!
//! - [`ledger`] owns stock: debit (with non-negativity enforcement) and
//!   credit against a row locked for the duration of the transaction.
//! - [`totals`] recomputes an order's total from its persisted items.
//! - [`coordinator::FulfillmentCoordinator`] drives the three line-item
//!   mutations as single atomic transactions, in the fixed order ledger →
//!   items → total, and owns every rollback.

pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod totals;

pub use coordinator::FulfillmentCoordinator;
pub use error::{FulfillmentError, Result};
