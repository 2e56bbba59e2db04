//! Application services sitting between the HTTP handlers and the stores.

mod accounts;
mod cart;
mod catalog;
mod events;
pub mod orders;

pub use accounts::AccountService;
pub use cart::{CartLineView, CartService};
pub use catalog::CatalogService;
pub use events::EventPublisher;
pub use orders::{
    GatewayVerification, HostedVerification, OrderOwner, OrderService, OrderSettings, OrderView, ReconcileReport,
};
