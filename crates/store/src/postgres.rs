use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use common::{CustomerId, Money, OrderId, OrderItemId, OrderState, ProductId};

use crate::{
    OrderItemRecord, OrderRecord, ProductRecord, Result, StoreError,
    store::{OrderStore, StoreTransaction},
};

/// PostgreSQL-backed store implementation.
///
/// Locking point-reads use `SELECT ... FOR UPDATE`; transactions come from
/// the pool and are committed or rolled back explicitly.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store on an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a small pool to the given database URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
        Ok(Self { pool })
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        tracing::info!("running database migrations");
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: PgRow) -> Result<ProductRecord> {
        Ok(ProductRecord {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get("stock")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<OrderRecord> {
        let state: String = row.try_get("state")?;
        Ok(OrderRecord {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            placed_at: row.try_get("placed_at")?,
            state: state
                .parse::<OrderState>()
                .map_err(|e| StoreError::Decode(e.to_string()))?,
            total: Money::from_cents(row.try_get("total_cents")?),
            row_version: row.try_get("row_version")?,
        })
    }

    fn row_to_item(row: PgRow) -> Result<OrderItemRecord> {
        Ok(OrderItemRecord {
            id: OrderItemId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
            quantity: row.try_get("quantity")?,
            subtotal: Money::from_cents(row.try_get("subtotal_cents")?),
        })
    }
}

const PRODUCT_COLUMNS: &str = "id, name, description, price_cents, stock";
const ORDER_COLUMNS: &str = "id, customer_id, placed_at, state, total_cents, row_version";
const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, subtotal_cents";

fn map_unique_violation(e: sqlx::Error, entity: &'static str, id: Uuid) -> StoreError {
    if let sqlx::Error::Database(db) = &e
        && matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
    {
        return StoreError::AlreadyExists { entity, id };
    }
    StoreError::from(e)
}

#[async_trait]
impl OrderStore for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn insert_product(&self, product: &ProductRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO products (id, name, description, price_cents, stock)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.stock)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "product", product.id.as_uuid()))?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<ProductRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_product).transpose()
    }

    async fn list_products(&self) -> Result<Vec<ProductRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn insert_order(&self, order: &OrderRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO orders (id, customer_id, placed_at, state, total_cents, row_version)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(order.placed_at)
        .bind(order.state.as_str())
        .bind(order.total.cents())
        .bind(order.row_version)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "order", order.id.as_uuid()))?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_order).transpose()
    }

    async fn update_order(&self, order: &OrderRecord) -> Result<OrderRecord> {
        let row = sqlx::query(&format!(
            "UPDATE orders
             SET customer_id = $2, state = $3, row_version = row_version + 1
             WHERE id = $1 AND row_version = $4
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(order.state.as_str())
        .bind(order.row_version)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_order(row),
            None => {
                // Distinguish a stale version from a missing row.
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE id = $1)")
                        .bind(order.id.as_uuid())
                        .fetch_one(&self.pool)
                        .await?;
                if exists {
                    Err(StoreError::ConcurrencyConflict {
                        entity: "order",
                        id: order.id.as_uuid(),
                    })
                } else {
                    Err(StoreError::RowNotFound {
                        entity: "order",
                        id: order.id.as_uuid(),
                    })
                }
            }
        }
    }

    async fn get_item(&self, id: OrderItemId) -> Result<Option<OrderItemRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Self::row_to_item).transpose()
    }

    async fn list_items(&self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id ASC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Self::row_to_item).collect()
    }
}

/// An open PostgreSQL transaction.
struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<ProductRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(PostgresStore::row_to_product).transpose()
    }

    async fn set_product_stock(&mut self, id: ProductId, stock: i64) -> Result<()> {
        let result = sqlx::query("UPDATE products SET stock = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(stock)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound {
                entity: "product",
                id: id.as_uuid(),
            });
        }
        Ok(())
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(PostgresStore::row_to_order).transpose()
    }

    async fn get_item(&mut self, id: OrderItemId) -> Result<Option<OrderItemRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(PostgresStore::row_to_item).transpose()
    }

    async fn insert_item(&mut self, item: &OrderItemRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, quantity, subtotal_cents)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(item.id.as_uuid())
        .bind(item.order_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(item.quantity)
        .bind(item.subtotal.cents())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, "order item", item.id.as_uuid()))?;
        Ok(())
    }

    async fn update_item(&mut self, item: &OrderItemRecord) -> Result<()> {
        let result = sqlx::query(
            "UPDATE order_items
             SET product_id = $2, quantity = $3, subtotal_cents = $4
             WHERE id = $1",
        )
        .bind(item.id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(item.quantity)
        .bind(item.subtotal.cents())
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound {
                entity: "order item",
                id: item.id.as_uuid(),
            });
        }
        Ok(())
    }

    async fn delete_item(&mut self, id: OrderItemId) -> Result<Option<OrderItemRecord>> {
        let row = sqlx::query(&format!(
            "DELETE FROM order_items WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(PostgresStore::row_to_item).transpose()
    }

    async fn list_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItemRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id ASC"
        ))
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(PostgresStore::row_to_item).collect()
    }

    async fn set_order_total(&mut self, id: OrderId, total: Money) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET total_cents = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(total.cents())
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound {
                entity: "order",
                id: id.as_uuid(),
            });
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
