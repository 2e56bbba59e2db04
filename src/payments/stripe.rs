//! Stripe Checkout via the REST API (no SDK dependency)

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::{http_client, CheckoutLine, CheckoutSession, HostedCheckout, PaymentError};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
}

impl StripeClient {
    pub fn new(secret_key: SecretString, api_base: impl Into<String>) -> Result<Self, PaymentError> {
        Ok(Self { http: http_client()?, api_base: api_base.into().trim_end_matches('/').to_string(), secret_key })
    }
}

/// Form fields for a one-off card payment session.
fn session_form(lines: &[CheckoutLine], currency: &str, success_url: &str, cancel_url: &str) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), success_url.to_string()),
        ("cancel_url".to_string(), cancel_url.to_string()),
    ];
    for (i, line) in lines.iter().enumerate() {
        form.push((format!("line_items[{i}][price_data][currency]"), currency.to_string()));
        form.push((format!("line_items[{i}][price_data][product_data][name]"), line.name.clone()));
        form.push((format!("line_items[{i}][price_data][unit_amount]"), line.unit_amount.to_string()));
        form.push((format!("line_items[{i}][quantity]"), line.quantity.to_string()));
    }
    form
}

#[async_trait]
impl HostedCheckout for StripeClient {
    async fn create_session(
        &self,
        lines: &[CheckoutLine],
        currency: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        let resp = self.http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(self.secret_key.expose_secret(), None::<&str>)
            .form(&session_form(lines, currency, success_url, cancel_url))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let message = body["error"]["message"].as_str().unwrap_or("unknown error");
            return Err(PaymentError::Rejected(format!("Stripe create_session failed ({status}): {message}")));
        }
        Ok(resp.json::<CheckoutSession>().await?)
    }
}
