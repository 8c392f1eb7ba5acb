//! Shared value types for the order fulfillment engine.
//!
//! Typed identifiers, integer-cent money, and the order lifecycle state.
//! Everything here is plain data: no IO, no business rules.

pub mod ids;
pub mod money;
pub mod state;

pub use ids::{CustomerId, OrderId, OrderItemId, ProductId};
pub use money::{Money, MoneyParseError};
pub use state::{OrderState, ParseOrderStateError};
