//! Persistence boundary for the order fulfillment engine.
//!
//! This crate owns the record structs, the transaction-capable
//! [`OrderStore`]/[`StoreTransaction`] contract, and two backends:
//! PostgreSQL ([`PostgresStore`], locking reads via `SELECT ... FOR UPDATE`)
//! and an in-memory twin ([`InMemoryStore`]) for tests and local runs.
//! No business validation lives here.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod records;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use query::{ProductPage, ProductQuery};
pub use records::{OrderItemRecord, OrderRecord, ProductRecord};
pub use store::{OrderStore, StoreTransaction};
