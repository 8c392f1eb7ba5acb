use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use common::{Money, OrderId, OrderItemId, ProductId};

use crate::{
    OrderItemRecord, OrderRecord, ProductRecord, Result, StoreError,
    store::{OrderStore, StoreTransaction},
};

#[derive(Debug, Clone, Default)]
struct Tables {
    products: HashMap<ProductId, ProductRecord>,
    orders: HashMap<OrderId, OrderRecord>,
    items: HashMap<OrderItemId, OrderItemRecord>,
}

/// In-memory store implementation for testing and local runs.
///
/// Provides the same interface as the PostgreSQL implementation. One mutex
/// guards all tables: a transaction holds it from `begin` until commit or
/// rollback, so transactions serialize. That is coarser than row locks but
/// preserves the locking-read contract — no transaction ever observes stock
/// another in-flight transaction is about to change. Writes go to a scratch
/// copy published atomically on commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of persisted line items, across all orders.
    pub async fn item_count(&self) -> usize {
        self.tables.lock().await.items.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let scratch = guard.clone();
        Ok(Box::new(InMemoryTransaction { guard, scratch }))
    }

    async fn insert_product(&self, product: &ProductRecord) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.products.contains_key(&product.id) {
            return Err(StoreError::AlreadyExists {
                entity: "product",
                id: product.id.as_uuid(),
            });
        }
        tables.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>> {
        Ok(self.tables.lock().await.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<ProductRecord>> {
        let mut products: Vec<_> = self.tables.lock().await.products.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.as_uuid().cmp(&b.id.as_uuid())));
        Ok(products)
    }

    async fn insert_order(&self, order: &OrderRecord) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.orders.contains_key(&order.id) {
            return Err(StoreError::AlreadyExists {
                entity: "order",
                id: order.id.as_uuid(),
            });
        }
        tables.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.tables.lock().await.orders.get(&id).cloned())
    }

    async fn update_order(&self, order: &OrderRecord) -> Result<OrderRecord> {
        let mut tables = self.tables.lock().await;
        let current = tables
            .orders
            .get_mut(&order.id)
            .ok_or(StoreError::RowNotFound {
                entity: "order",
                id: order.id.as_uuid(),
            })?;
        if current.row_version != order.row_version {
            return Err(StoreError::ConcurrencyConflict {
                entity: "order",
                id: order.id.as_uuid(),
            });
        }
        current.customer_id = order.customer_id;
        current.state = order.state;
        current.row_version += 1;
        Ok(current.clone())
    }

    async fn get_item(&self, id: OrderItemId) -> Result<Option<OrderItemRecord>> {
        Ok(self.tables.lock().await.items.get(&id).cloned())
    }

    async fn list_items(&self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let tables = self.tables.lock().await;
        let mut items: Vec<_> = tables
            .items
            .values()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.id.as_uuid());
        Ok(items)
    }
}

/// An open in-memory transaction: exclusive table access plus a scratch
/// copy the writes land in.
struct InMemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    scratch: Tables,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<ProductRecord>> {
        Ok(self.scratch.products.get(&id).cloned())
    }

    async fn set_product_stock(&mut self, id: ProductId, stock: i64) -> Result<()> {
        let product = self
            .scratch
            .products
            .get_mut(&id)
            .ok_or(StoreError::RowNotFound {
                entity: "product",
                id: id.as_uuid(),
            })?;
        product.stock = stock;
        Ok(())
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.scratch.orders.get(&id).cloned())
    }

    async fn get_item(&mut self, id: OrderItemId) -> Result<Option<OrderItemRecord>> {
        Ok(self.scratch.items.get(&id).cloned())
    }

    async fn insert_item(&mut self, item: &OrderItemRecord) -> Result<()> {
        if self.scratch.items.contains_key(&item.id) {
            return Err(StoreError::AlreadyExists {
                entity: "order item",
                id: item.id.as_uuid(),
            });
        }
        // Referential checks the SQL schema enforces via foreign keys.
        if !self.scratch.orders.contains_key(&item.order_id) {
            return Err(StoreError::RowNotFound {
                entity: "order",
                id: item.order_id.as_uuid(),
            });
        }
        if !self.scratch.products.contains_key(&item.product_id) {
            return Err(StoreError::RowNotFound {
                entity: "product",
                id: item.product_id.as_uuid(),
            });
        }
        self.scratch.items.insert(item.id, item.clone());
        Ok(())
    }

    async fn update_item(&mut self, item: &OrderItemRecord) -> Result<()> {
        if !self.scratch.products.contains_key(&item.product_id) {
            return Err(StoreError::RowNotFound {
                entity: "product",
                id: item.product_id.as_uuid(),
            });
        }
        let current = self
            .scratch
            .items
            .get_mut(&item.id)
            .ok_or(StoreError::RowNotFound {
                entity: "order item",
                id: item.id.as_uuid(),
            })?;
        current.product_id = item.product_id;
        current.quantity = item.quantity;
        current.subtotal = item.subtotal;
        Ok(())
    }

    async fn delete_item(&mut self, id: OrderItemId) -> Result<Option<OrderItemRecord>> {
        Ok(self.scratch.items.remove(&id))
    }

    async fn list_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let mut items: Vec<_> = self
            .scratch
            .items
            .values()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.id.as_uuid());
        Ok(items)
    }

    async fn set_order_total(&mut self, id: OrderId, total: Money) -> Result<()> {
        let order = self
            .scratch
            .orders
            .get_mut(&id)
            .ok_or(StoreError::RowNotFound {
                entity: "order",
                id: id.as_uuid(),
            })?;
        order.total = total;
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        *self.guard = self.scratch;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        // Dropping the scratch copy and the guard is the whole rollback.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use common::{CustomerId, Money, OrderItemId};

    use super::*;

    fn product(stock: i64) -> ProductRecord {
        ProductRecord {
            id: ProductId::new(),
            name: "Widget".to_string(),
            description: None,
            price: Money::from_cents(250),
            stock,
        }
    }

    async fn seed_order(store: &InMemoryStore) -> OrderRecord {
        let order = OrderRecord::new(CustomerId::new(), Utc::now());
        store.insert_order(&order).await.unwrap();
        order
    }

    #[tokio::test]
    async fn committed_writes_are_visible() {
        let store = InMemoryStore::new();
        let p = product(10);
        store.insert_product(&p).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.set_product_stock(p.id, 7).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.get_product(p.id).await.unwrap().unwrap().stock, 7);
    }

    #[tokio::test]
    async fn rollback_discards_all_writes() {
        let store = InMemoryStore::new();
        let p = product(10);
        store.insert_product(&p).await.unwrap();
        let order = seed_order(&store).await;

        let mut tx = store.begin().await.unwrap();
        tx.set_product_stock(p.id, 3).await.unwrap();
        tx.insert_item(&OrderItemRecord {
            id: OrderItemId::new(),
            order_id: order.id,
            product_id: p.id,
            quantity: 7,
            subtotal: Money::from_cents(1750),
        })
        .await
        .unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(store.get_product(p.id).await.unwrap().unwrap().stock, 10);
        assert_eq!(store.item_count().await, 0);
    }

    #[tokio::test]
    async fn delete_item_returns_pre_delete_row() {
        let store = InMemoryStore::new();
        let p = product(10);
        store.insert_product(&p).await.unwrap();
        let order = seed_order(&store).await;
        let item = OrderItemRecord {
            id: OrderItemId::new(),
            order_id: order.id,
            product_id: p.id,
            quantity: 2,
            subtotal: Money::from_cents(500),
        };

        let mut tx = store.begin().await.unwrap();
        tx.insert_item(&item).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let removed = tx.delete_item(item.id).await.unwrap();
        assert_eq!(removed, Some(item.clone()));
        let missing = tx.delete_item(item.id).await.unwrap();
        assert!(missing.is_none());
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn update_order_rejects_stale_row_version() {
        let store = InMemoryStore::new();
        let order = seed_order(&store).await;

        let fresh = store.update_order(&order).await.unwrap();
        assert_eq!(fresh.row_version, order.row_version + 1);

        // Second writer still holds the original record.
        let result = store.update_order(&order).await;
        assert!(matches!(
            result,
            Err(StoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn transactions_serialize() {
        let store = InMemoryStore::new();
        let p = product(10);
        store.insert_product(&p).await.unwrap();

        let mut tx1 = store.begin().await.unwrap();
        tx1.set_product_stock(p.id, 5).await.unwrap();

        let store2 = store.clone();
        let pid = p.id;
        let second = tokio::spawn(async move {
            let mut tx2 = store2.begin().await.unwrap();
            let seen = tx2.product_for_update(pid).await.unwrap().unwrap().stock;
            tx2.commit().await.unwrap();
            seen
        });

        // The second transaction must block until the first finishes.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!second.is_finished());

        tx1.commit().await.unwrap();
        assert_eq!(second.await.unwrap(), 5);
    }

    #[tokio::test]
    async fn insert_item_enforces_references() {
        let store = InMemoryStore::new();
        let order = seed_order(&store).await;

        let mut tx = store.begin().await.unwrap();
        let result = tx
            .insert_item(&OrderItemRecord {
                id: OrderItemId::new(),
                order_id: order.id,
                product_id: ProductId::new(),
                quantity: 1,
                subtotal: Money::from_cents(100),
            })
            .await;
        assert!(matches!(result, Err(StoreError::RowNotFound { .. })));
        tx.rollback().await.unwrap();
    }
}
