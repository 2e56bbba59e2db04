//! Persistence boundary.
//!
//! Each record (account, product, order) is a single row updated
//! atomically. Multi-record flows are not transactional; see
//! `OrderService::reconcile` for the repair sweep.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Account, Cart, Order, Product};
use crate::domain::value_objects::Email;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Duplicate {0}")]
    Duplicate(&'static str),
    #[error("Record was modified concurrently")]
    Conflict,
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProductFilter {
    All,
    Bestsellers,
    Category(String),
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with `Duplicate("email")` when the email is taken.
    async fn insert_account(&self, account: &Account) -> StoreResult<()>;
    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>>;
    async fn find_account_by_email(&self, email: &Email) -> StoreResult<Option<Account>>;
    async fn find_accounts(&self, ids: &[Uuid]) -> StoreResult<Vec<Account>>;
    async fn list_accounts(&self) -> StoreResult<Vec<Account>>;
    /// Returns `false` when the account does not exist.
    async fn save_cart(&self, account_id: Uuid, cart: &Cart) -> StoreResult<bool>;
    /// Appends an order reference unless already present.
    async fn append_order_reference(&self, account_id: Uuid, order_id: Uuid) -> StoreResult<bool>;
    async fn delete_account(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;
    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn find_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>>;
    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>>;
    /// Returns `false` when the product does not exist.
    async fn update_product(&self, product: &Product) -> StoreResult<bool>;
    async fn delete_product(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &Order) -> StoreResult<()>;
    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>>;
    /// Only returns the order when it belongs to `account_id`.
    async fn find_order_for_account(&self, account_id: Uuid, order_id: Uuid) -> StoreResult<Option<Order>>;
    async fn list_orders_for_account(&self, account_id: Uuid) -> StoreResult<Vec<Order>>;
    async fn list_orders(&self) -> StoreResult<Vec<Order>>;
    /// Orders created before `cutoff` that are still unpaid and untouched by
    /// fulfilment or cancellation.
    async fn list_pending_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Order>>;
    async fn list_created_after(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Order>>;
    /// Optimistic update: succeeds only if the stored version equals
    /// `order.version`, which is then incremented.
    async fn update_order(&self, order: &mut Order) -> StoreResult<()>;
    /// Deletes only while the stored version still equals `version`.
    async fn delete_order(&self, id: Uuid, version: i64) -> StoreResult<bool>;
}
