//! Aggregates module
pub mod account;
pub mod product;
pub mod order;
pub mod cart;

pub use account::{Account, AccountSummary, Role};
pub use product::{Product, ProductDraft, ProductError, ProductSummary, ProductUpdate, Review};
pub use order::{Address, LineItem, NewOrder, Order, OrderError, OrderStatus, PaymentMethod, PaymentStatus};
pub use cart::{Cart, CartError, CartItem, CartKey};
