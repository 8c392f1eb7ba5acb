use async_trait::async_trait;
use common::{Money, OrderId, OrderItemId, ProductId};

use crate::{OrderItemRecord, OrderRecord, ProductRecord, Result};

/// The transaction-capable query interface the fulfillment engine sits on.
///
/// Plain reads and single-row writes run outside any transaction and see
/// committed state only. Multi-step mutations go through [`Self::begin`] and
/// the returned [`StoreTransaction`]. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Short name of the backing implementation, for health reporting.
    fn backend_name(&self) -> &'static str;

    /// Opens a transaction. Everything done through the returned handle is
    /// atomic: it becomes visible on `commit` or vanishes on `rollback`.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    async fn insert_product(&self, product: &ProductRecord) -> Result<()>;
    async fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>>;
    async fn list_products(&self) -> Result<Vec<ProductRecord>>;

    async fn insert_order(&self, order: &OrderRecord) -> Result<()>;
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Updates the order's caller-editable fields (customer, state).
    ///
    /// The update is guarded by `order.row_version`; a stale version fails
    /// with `ConcurrencyConflict`. Returns the record with the bumped
    /// version. `total` and `placed_at` are not written here.
    async fn update_order(&self, order: &OrderRecord) -> Result<OrderRecord>;

    async fn get_item(&self, id: OrderItemId) -> Result<Option<OrderItemRecord>>;
    async fn list_items(&self, order_id: OrderId) -> Result<Vec<OrderItemRecord>>;
}

/// A single open transaction.
///
/// Dropping the handle without calling either consuming method rolls the
/// transaction back (both backends treat an unfinished transaction as
/// abandoned).
#[async_trait]
pub trait StoreTransaction: Send {
    /// Locking point-read of a product row.
    ///
    /// The returned row is exclusively locked until this transaction ends;
    /// a concurrent locking read of the same product blocks rather than
    /// observing stale stock.
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<ProductRecord>>;

    /// Writes a product's stock. The row must have been locked by
    /// [`Self::product_for_update`] first.
    async fn set_product_stock(&mut self, id: ProductId, stock: i64) -> Result<()>;

    async fn get_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>>;

    async fn get_item(&mut self, id: OrderItemId) -> Result<Option<OrderItemRecord>>;
    async fn insert_item(&mut self, item: &OrderItemRecord) -> Result<()>;
    async fn update_item(&mut self, item: &OrderItemRecord) -> Result<()>;

    /// Deletes an item, returning the pre-delete row so the caller can
    /// compute the credit-back without a second read. `None` if the id does
    /// not exist.
    async fn delete_item(&mut self, id: OrderItemId) -> Result<Option<OrderItemRecord>>;

    async fn list_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>>;

    /// Writes the order's derived total. Kept as the last write before
    /// commit by the fulfillment engine.
    async fn set_order_total(&mut self, id: OrderId, total: Money) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
    async fn rollback(self: Box<Self>) -> Result<()>;
}
