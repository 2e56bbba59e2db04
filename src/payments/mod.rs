//! Payment provider adapters.
//!
//! Two capabilities are consumed by the order service: a hosted checkout
//! session (card details never reach this server) and a signed-order
//! gateway whose payments are verified locally by HMAC.

mod razorpay;
mod stripe;

pub use razorpay::{verify_payment_signature, RazorpayClient, DEFAULT_API_BASE as RAZORPAY_API_BASE};
pub use stripe::{StripeClient, DEFAULT_API_BASE as STRIPE_API_BASE};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Provider rejected request: {0}")]
    Rejected(String),
}

/// One line on a hosted checkout page, priced in minor units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckoutLine {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[async_trait]
pub trait HostedCheckout: Send + Sync {
    async fn create_session(
        &self,
        lines: &[CheckoutLine],
        currency: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, PaymentError>;
}

#[async_trait]
pub trait SignedOrderGateway: Send + Sync {
    async fn create_order(&self, amount_minor: i64, currency: &str, receipt: &str) -> Result<GatewayOrder, PaymentError>;

    /// Pure local check; no network call.
    fn verify_signature(&self, provider_order_id: &str, payment_id: &str, signature: &str) -> bool;
}

pub(crate) fn http_client() -> Result<reqwest::Client, PaymentError> {
    Ok(reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}
