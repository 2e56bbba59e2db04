//! In-process store used by tests and local runs without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AccountStore, CatalogStore, OrderStore, ProductFilter, StoreError, StoreResult};
use crate::domain::aggregates::{Account, Cart, Order, Product};
use crate::domain::value_objects::Email;

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    products: HashMap<Uuid, Product>,
    orders: HashMap<Uuid, Order>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

fn by_creation<T>(mut rows: Vec<T>, key: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    rows.sort_by_key(|r| key(r));
    rows
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert_account(&self, account: &Account) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if t.accounts.values().any(|a| a.email == account.email) { return Err(StoreError::Duplicate("email")); }
        t.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &Email) -> StoreResult<Option<Account>> {
        Ok(self.tables.read().await.accounts.values().find(|a| &a.email == email).cloned())
    }

    async fn find_accounts(&self, ids: &[Uuid]) -> StoreResult<Vec<Account>> {
        let t = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| t.accounts.get(id).cloned()).collect())
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        let rows: Vec<Account> = self.tables.read().await.accounts.values().cloned().collect();
        Ok(by_creation(rows, |a| a.created_at))
    }

    async fn save_cart(&self, account_id: Uuid, cart: &Cart) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        Ok(match t.accounts.get_mut(&account_id) {
            Some(account) => { account.cart = cart.clone(); account.updated_at = Utc::now(); true }
            None => false,
        })
    }

    async fn append_order_reference(&self, account_id: Uuid, order_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        Ok(t.accounts.get_mut(&account_id).map(|a| a.link_order(order_id)).unwrap_or(false))
    }

    async fn delete_account(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.accounts.remove(&id).is_some())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        let mut stored = product.clone();
        stored.events.clear();
        self.tables.write().await.products.insert(product.id, stored);
        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn find_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        let t = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| t.products.get(id).cloned()).collect())
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let t = self.tables.read().await;
        let rows: Vec<Product> = t.products.values()
            .filter(|p| match filter {
                ProductFilter::All => true,
                ProductFilter::Bestsellers => p.bestseller,
                ProductFilter::Category(c) => &p.category == c,
            })
            .cloned()
            .collect();
        Ok(by_creation(rows, |p| p.created_at))
    }

    async fn update_product(&self, product: &Product) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        Ok(match t.products.get_mut(&product.id) {
            Some(slot) => { *slot = product.clone(); slot.events.clear(); true }
            None => false,
        })
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.products.remove(&id).is_some())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut stored = order.clone();
        stored.events.clear();
        self.tables.write().await.orders.insert(order.id, stored);
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn find_order_for_account(&self, account_id: Uuid, order_id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&order_id).filter(|o| o.user == account_id).cloned())
    }

    async fn list_orders_for_account(&self, account_id: Uuid) -> StoreResult<Vec<Order>> {
        let rows: Vec<Order> = self.tables.read().await.orders.values().filter(|o| o.user == account_id).cloned().collect();
        Ok(by_creation(rows, |o| o.created_at))
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let rows: Vec<Order> = self.tables.read().await.orders.values().cloned().collect();
        Ok(by_creation(rows, |o| o.created_at))
    }

    async fn list_pending_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Order>> {
        let rows: Vec<Order> = self.tables.read().await.orders.values()
            .filter(|o| o.is_awaiting_payment() && o.created_at < cutoff)
            .cloned()
            .collect();
        Ok(by_creation(rows, |o| o.created_at))
    }

    async fn list_created_after(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Order>> {
        let rows: Vec<Order> = self.tables.read().await.orders.values().filter(|o| o.created_at > cutoff).cloned().collect();
        Ok(by_creation(rows, |o| o.created_at))
    }

    async fn update_order(&self, order: &mut Order) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let slot = t.orders.get_mut(&order.id).ok_or(StoreError::Conflict)?;
        if slot.version != order.version { return Err(StoreError::Conflict); }
        order.version += 1;
        *slot = order.clone();
        slot.events.clear();
        Ok(())
    }

    async fn delete_order(&self, id: Uuid, version: i64) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        if t.orders.get(&id).map(|o| o.version) != Some(version) { return Ok(false); }
        Ok(t.orders.remove(&id).is_some())
    }
}
