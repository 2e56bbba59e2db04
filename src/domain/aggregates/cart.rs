//! Cart Aggregate
//!
//! The cart is embedded in the owning account. Entries are keyed by
//! (product, size) and keep the order in which they were first added.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CartKey {
    pub product: Uuid,
    pub size: Option<String>,
}

impl CartKey {
    pub fn new(product: Uuid, size: Option<String>) -> Self { Self { product, size } }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product: Uuid,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartItem>", into = "Vec<CartItem>")]
pub struct Cart {
    entries: IndexMap<CartKey, u32>,
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn items(&self) -> impl Iterator<Item = CartItem> + '_ {
        self.entries.iter().map(|(key, quantity)| CartItem {
            product: key.product,
            size: key.size.clone(),
            quantity: *quantity,
        })
    }

    /// Adds one unit; returns the resulting quantity.
    pub fn add_one(&mut self, key: CartKey) -> u32 {
        let quantity = self.entries.entry(key).or_insert(0);
        *quantity = quantity.saturating_add(1);
        *quantity
    }

    /// Sets the quantity of an existing entry. Zero removes it.
    pub fn set_quantity(&mut self, key: &CartKey, quantity: u32) -> Result<(), CartError> {
        if !self.entries.contains_key(key) { return Err(CartError::ItemNotFound); }
        if quantity == 0 {
            self.entries.shift_remove(key);
        } else if let Some(current) = self.entries.get_mut(key) {
            *current = quantity;
        }
        Ok(())
    }

    /// Removes an entry; returns whether anything was removed.
    pub fn remove(&mut self, key: &CartKey) -> bool { self.entries.shift_remove(key).is_some() }
}

impl From<Vec<CartItem>> for Cart {
    fn from(items: Vec<CartItem>) -> Self {
        let mut entries: IndexMap<CartKey, u32> = IndexMap::with_capacity(items.len());
        for item in items.into_iter().filter(|i| i.quantity > 0) {
            let quantity = entries.entry(CartKey::new(item.product, item.size)).or_insert(0);
            *quantity = quantity.saturating_add(item.quantity);
        }
        Self { entries }
    }
}

impl From<Cart> for Vec<CartItem> {
    fn from(cart: Cart) -> Self { cart.items().collect() }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Item not found in cart")]
    ItemNotFound,
}
