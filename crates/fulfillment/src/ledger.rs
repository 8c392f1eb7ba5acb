//! Inventory ledger: the only writer of `product.stock`.
//!
//! Every operation reads the product with a locking read, so two concurrent
//! debits against the same product can never both pass their stock check on
//! stale data.

use common::ProductId;
use store::{ProductRecord, StoreTransaction};

use crate::error::{FulfillmentError, Result};

/// Debits `qty` units from the product's stock.
///
/// Fails with `InsufficientStock` (carrying the freshly locked available
/// quantity) when the stock does not cover the request. Returns the
/// post-debit row.
pub async fn debit(
    tx: &mut dyn StoreTransaction,
    product_id: ProductId,
    qty: i64,
) -> Result<ProductRecord> {
    apply_diff(tx, product_id, qty).await
}

/// Credits `qty` units back to the product's stock.
///
/// Unconditional: the engine only ever credits quantity it previously
/// debited. Returns the post-credit row.
pub async fn credit(
    tx: &mut dyn StoreTransaction,
    product_id: ProductId,
    qty: i64,
) -> Result<ProductRecord> {
    apply_diff(tx, product_id, -qty).await
}

/// Applies a net signed adjustment against one locked product row.
///
/// `diff > 0` debits, `diff < 0` credits, `diff == 0` locks and returns the
/// row without writing. Same-product quantity edits go through here so the
/// credit and the stock check happen against a single locked row.
pub async fn apply_diff(
    tx: &mut dyn StoreTransaction,
    product_id: ProductId,
    diff: i64,
) -> Result<ProductRecord> {
    let mut product = tx
        .product_for_update(product_id)
        .await?
        .ok_or(FulfillmentError::InvalidProduct(product_id))?;

    if diff == 0 {
        return Ok(product);
    }
    if product.stock < diff {
        metrics::counter!("fulfillment_insufficient_stock_total").increment(1);
        return Err(FulfillmentError::InsufficientStock {
            product_id,
            requested: diff,
            available: product.stock,
        });
    }

    product.stock -= diff;
    tx.set_product_stock(product_id, product.stock).await?;
    tracing::debug!(%product_id, diff, stock = product.stock, "stock adjusted");
    Ok(product)
}
