//! Order total aggregator.
//!
//! `order.total` is never read-modify-written: it is always recomputed from
//! the persisted items inside the same transaction, so concurrent edits to
//! different items of one order cannot lose updates — the last committer's
//! figure is derived from what is actually persisted.

use common::{Money, OrderId};
use store::StoreTransaction;

use crate::error::{FulfillmentError, Result};

/// Recomputes and writes the order's total from its persisted items.
///
/// Idempotent; 0 if the order has no items. Called as the last step of every
/// item mutation so the write lands immediately before commit.
pub async fn recompute(tx: &mut dyn StoreTransaction, order_id: OrderId) -> Result<Money> {
    let items = tx.list_items(order_id).await?;
    let total: Money = items.iter().map(|i| i.subtotal).sum();

    tx.get_order(order_id)
        .await?
        .ok_or(FulfillmentError::OrderVanished(order_id))?;
    tx.set_order_total(order_id, total).await?;
    Ok(total)
}
