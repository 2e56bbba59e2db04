//! Shared application state

use crate::auth::TokenIssuer;
use crate::services::{AccountService, CartService, CatalogService, OrderService};

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub catalog: CatalogService,
    pub carts: CartService,
    pub orders: OrderService,
    pub tokens: TokenIssuer,
    /// Sets the `Secure` flag on the session cookie.
    pub secure_cookies: bool,
}
