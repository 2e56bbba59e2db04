//! Storefront backend
//!
//! Clothing storefront API with hosted and signed-gateway payments.
//!
//! ## Features
//! - Accounts with cookie sessions, Google sign-in and admin management
//! - Product catalog with reviews and bestseller listings
//! - Per-account shopping cart
//! - Order lifecycle for cash, Stripe and Razorpay checkouts
//! - Background reconciliation of abandoned checkouts

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod payments;
pub mod services;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
