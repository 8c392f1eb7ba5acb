//! Route handlers.

pub mod health;
pub mod items;
pub mod metrics;
pub mod orders;
pub mod products;

use fulfillment::FulfillmentCoordinator;
use store::OrderStore;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub store: S,
    pub coordinator: FulfillmentCoordinator<S>,
}
