use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{Account, Cart, CartKey};
use crate::error::{AppError, AppResult};
use crate::store::{AccountStore, CatalogStore};

/// Cart entry resolved against the current catalog.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartLineView {
    pub product: Uuid,
    pub name: String,
    pub price: Decimal,
    pub size: Option<String>,
    pub quantity: u32,
}

#[derive(Clone)]
pub struct CartService {
    accounts: Arc<dyn AccountStore>,
    catalog: Arc<dyn CatalogStore>,
}

impl CartService {
    pub fn new(accounts: Arc<dyn AccountStore>, catalog: Arc<dyn CatalogStore>) -> Self { Self { accounts, catalog } }

    pub async fn add(&self, account: &Account, product: Uuid, size: Option<String>) -> AppResult<Cart> {
        if self.catalog.find_product(product).await?.is_none() {
            return Err(AppError::NotFound("Product"));
        }
        let mut cart = account.cart.clone();
        cart.add_one(CartKey::new(product, size));
        self.save(account.id, cart).await
    }

    /// Entries whose product has been removed from the catalog are skipped.
    pub async fn view(&self, account: &Account) -> AppResult<Vec<CartLineView>> {
        let ids: Vec<Uuid> = account.cart.items().map(|i| i.product).collect();
        let products: HashMap<Uuid, _> = self.catalog.find_products(&ids).await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        Ok(account.cart.items()
            .filter_map(|item| products.get(&item.product).map(|p| CartLineView {
                product: p.id,
                name: p.name.clone(),
                price: p.price,
                size: item.size,
                quantity: item.quantity,
            }))
            .collect())
    }

    pub async fn update_quantity(&self, account: &Account, product: Uuid, size: Option<String>, quantity: u32) -> AppResult<Cart> {
        let mut cart = account.cart.clone();
        cart.set_quantity(&CartKey::new(product, size), quantity)?;
        self.save(account.id, cart).await
    }

    pub async fn remove_one(&self, account: &Account, product: Uuid, size: Option<String>) -> AppResult<Cart> {
        let mut cart = account.cart.clone();
        cart.remove(&CartKey::new(product, size));
        self.save(account.id, cart).await
    }

    pub async fn clear(&self, account_id: Uuid) -> AppResult<Cart> {
        self.save(account_id, Cart::new()).await
    }

    async fn save(&self, account_id: Uuid, cart: Cart) -> AppResult<Cart> {
        if !self.accounts.save_cart(account_id, &cart).await? {
            return Err(AppError::NotFound("User"));
        }
        Ok(cart)
    }
}
