//! Fulfillment coordinator: the transaction boundary for line-item
//! mutations.
//!
//! Each entry point is one atomic unit: pre-validate without a transaction,
//! then re-validate against freshly locked state inside one, apply ledger →
//! item → total in that fixed order, and commit. The coordinator is the only
//! place that rolls back; every failure path either rolls back and returns a
//! typed error or never touched state at all.

use common::{OrderId, OrderItemId, ProductId};
use store::{OrderItemRecord, OrderStore, StoreTransaction};

use crate::error::{FulfillmentError, Result};
use crate::{ledger, totals};

/// Orchestrates create/edit/delete of a line item as single atomic
/// transactions spanning the inventory ledger, the item rows, and the order
/// total.
pub struct FulfillmentCoordinator<S: OrderStore> {
    store: S,
}

impl<S: OrderStore> FulfillmentCoordinator<S> {
    /// Creates a coordinator on the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates a line item: debits the product's stock, inserts the item
    /// with `subtotal = price * quantity`, and recomputes the order total.
    ///
    /// Validation failures are raised before any transaction opens; a stock
    /// shortfall detected under lock rolls everything back.
    #[tracing::instrument(skip(self))]
    pub async fn create_item(
        &self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<OrderItemRecord> {
        metrics::counter!("fulfillment_create_item_total").increment(1);

        if quantity < 1 {
            return Err(FulfillmentError::InvalidQuantity(quantity));
        }
        self.store
            .get_order(order_id)
            .await?
            .ok_or(FulfillmentError::InvalidOrder(order_id))?;
        self.store
            .get_product(product_id)
            .await?
            .ok_or(FulfillmentError::InvalidProduct(product_id))?;

        let mut tx = self.store.begin().await?;
        match create_in_tx(tx.as_mut(), order_id, product_id, quantity).await {
            Ok(item) => {
                tx.commit().await?;
                tracing::info!(%order_id, %product_id, quantity, item_id = %item.id, "item created");
                Ok(item)
            }
            Err(err) => abort(tx, err).await,
        }
    }

    /// Edits a line item's product and/or quantity.
    ///
    /// Same product: the quantity change is applied as one net diff against
    /// the locked row. Different product: the old reservation is credited
    /// back in full, then the new product is debited.
    #[tracing::instrument(skip(self))]
    pub async fn edit_item(
        &self,
        item_id: OrderItemId,
        new_product_id: ProductId,
        new_quantity: i64,
    ) -> Result<OrderItemRecord> {
        metrics::counter!("fulfillment_edit_item_total").increment(1);

        if new_quantity < 1 {
            return Err(FulfillmentError::InvalidQuantity(new_quantity));
        }
        let existing = self
            .store
            .get_item(item_id)
            .await?
            .ok_or(FulfillmentError::ItemNotFound(item_id))?;
        self.store
            .get_product(new_product_id)
            .await?
            .ok_or(FulfillmentError::InvalidProduct(new_product_id))?;
        self.store
            .get_order(existing.order_id)
            .await?
            .ok_or(FulfillmentError::InvalidOrder(existing.order_id))?;

        let mut tx = self.store.begin().await?;
        match edit_in_tx(tx.as_mut(), item_id, new_product_id, new_quantity).await {
            Ok(item) => {
                tx.commit().await?;
                tracing::info!(%item_id, %new_product_id, new_quantity, "item edited");
                Ok(item)
            }
            Err(err) => abort(tx, err).await,
        }
    }

    /// Deletes a line item, crediting its reserved quantity back to the
    /// product and recomputing the order total.
    ///
    /// Returns the removed row, or `None` if the id did not exist — deleting
    /// something already gone is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn delete_item(&self, item_id: OrderItemId) -> Result<Option<OrderItemRecord>> {
        metrics::counter!("fulfillment_delete_item_total").increment(1);

        let mut tx = self.store.begin().await?;
        match delete_in_tx(tx.as_mut(), item_id).await {
            Ok(removed) => {
                tx.commit().await?;
                if let Some(item) = &removed {
                    tracing::info!(%item_id, order_id = %item.order_id, "item deleted");
                }
                Ok(removed)
            }
            Err(err) => abort(tx, err).await,
        }
    }
}

/// Rolls the transaction back and propagates the original error. A failed
/// rollback is logged, never allowed to mask the cause.
async fn abort<T>(tx: Box<dyn StoreTransaction>, err: FulfillmentError) -> Result<T> {
    metrics::counter!("fulfillment_rollbacks_total").increment(1);
    if let Err(rollback_err) = tx.rollback().await {
        tracing::error!(error = %rollback_err, cause = %err, "rollback failed");
    }
    Err(err)
}

async fn create_in_tx(
    tx: &mut dyn StoreTransaction,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i64,
) -> Result<OrderItemRecord> {
    // Ledger first: the locking read re-checks stock against fresh state.
    let product = ledger::debit(tx, product_id, quantity).await?;
    let subtotal =
        product
            .price
            .times(quantity)
            .ok_or(FulfillmentError::SubtotalOverflow {
                product_id,
                price: product.price,
                quantity,
            })?;
    let item = OrderItemRecord {
        id: OrderItemId::new(),
        order_id,
        product_id,
        quantity,
        subtotal,
    };
    tx.insert_item(&item).await?;
    totals::recompute(tx, order_id).await?;
    Ok(item)
}

async fn edit_in_tx(
    tx: &mut dyn StoreTransaction,
    item_id: OrderItemId,
    new_product_id: ProductId,
    new_quantity: i64,
) -> Result<OrderItemRecord> {
    // Fresh read: the pre-validated copy may be stale by now.
    let original = tx
        .get_item(item_id)
        .await?
        .ok_or(FulfillmentError::ItemNotFound(item_id))?;

    let product = if new_product_id == original.product_id {
        ledger::apply_diff(tx, new_product_id, new_quantity - original.quantity).await?
    } else {
        ledger::credit(tx, original.product_id, original.quantity).await?;
        ledger::debit(tx, new_product_id, new_quantity).await?
    };

    let subtotal =
        product
            .price
            .times(new_quantity)
            .ok_or(FulfillmentError::SubtotalOverflow {
                product_id: new_product_id,
                price: product.price,
                quantity: new_quantity,
            })?;
    let updated = OrderItemRecord {
        id: original.id,
        order_id: original.order_id,
        product_id: new_product_id,
        quantity: new_quantity,
        subtotal,
    };
    tx.update_item(&updated).await?;
    totals::recompute(tx, original.order_id).await?;
    Ok(updated)
}

async fn delete_in_tx(
    tx: &mut dyn StoreTransaction,
    item_id: OrderItemId,
) -> Result<Option<OrderItemRecord>> {
    let Some(removed) = tx.delete_item(item_id).await? else {
        return Ok(None);
    };
    ledger::credit(tx, removed.product_id, removed.quantity).await?;
    totals::recompute(tx, removed.order_id).await?;
    Ok(Some(removed))
}
