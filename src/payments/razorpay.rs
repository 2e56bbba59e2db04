//! Razorpay orders API and payment signature verification

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::{http_client, GatewayOrder, PaymentError, SignedOrderGateway};

pub const DEFAULT_API_BASE: &str = "https://api.razorpay.com";

#[derive(Clone)]
pub struct RazorpayClient {
    http: reqwest::Client,
    api_base: String,
    key_id: String,
    key_secret: SecretString,
}

impl RazorpayClient {
    pub fn new(key_id: impl Into<String>, key_secret: SecretString, api_base: impl Into<String>) -> Result<Self, PaymentError> {
        Ok(Self {
            http: http_client()?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret,
        })
    }
}

/// Checks `signature` (hex) against HMAC-SHA256(secret, "{order_id}|{payment_id}").
/// Comparison is constant-time.
pub fn verify_payment_signature(secret: &str, provider_order_id: &str, payment_id: &str, signature: &str) -> bool {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(provider_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    mac.verify_slice(&expected).is_ok()
}

#[async_trait]
impl SignedOrderGateway for RazorpayClient {
    async fn create_order(&self, amount_minor: i64, currency: &str, receipt: &str) -> Result<GatewayOrder, PaymentError> {
        let resp = self.http
            .post(format!("{}/v1/orders", self.api_base))
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(&serde_json::json!({ "amount": amount_minor, "currency": currency, "receipt": receipt }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let message = body["error"]["description"].as_str().unwrap_or("unknown error");
            return Err(PaymentError::Rejected(format!("Razorpay create_order failed ({status}): {message}")));
        }
        Ok(resp.json::<GatewayOrder>().await?)
    }

    fn verify_signature(&self, provider_order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_payment_signature(self.key_secret.expose_secret(), provider_order_id, payment_id, signature)
    }
}
