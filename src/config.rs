//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `ACCESS_TOKEN_SECRET` - JWT signing secret (outside development)
//! - `STRIPE_SECRET_KEY`, `RAZORPAY_KEY_ID`, `RAZORPAY_KEY_SECRET` (outside development)
//!
//! ## Optional
//! - `ENVIRONMENT` - development | production (default: development)
//! - `PORT` - Listen port (default: 5000)
//! - `CLIENT_URL` - Storefront URL for checkout redirects (default: http://localhost:5173)
//! - `ALLOWED_ORIGINS` - Comma-separated CORS origins (default: `CLIENT_URL`)
//! - `STRIPE_API_BASE`, `RAZORPAY_API_BASE`, `GOOGLE_USERINFO_URL` - provider endpoints
//! - `NATS_URL` - Event bus; events are only logged when unset
//! - `CURRENCY` - Hosted checkout currency (default: inr)
//! - `DELIVERY_CHARGE` - Flat delivery charge (default: 10)
//! - `RECONCILE_INTERVAL_SECS` - Sweep interval (default: 600)
//! - `RECONCILE_STALE_AFTER_MINS` - Pending orders older than this are stale (default: 120, must be positive)

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

use crate::auth::DEFAULT_USERINFO_URL;
use crate::payments::{RAZORPAY_API_BASE, STRIPE_API_BASE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: SecretString,
    pub port: u16,
    /// development | production
    pub environment: String,
    pub client_url: String,
    pub allowed_origins: Vec<String>,
    pub access_token_secret: SecretString,
    pub stripe_secret_key: SecretString,
    pub stripe_api_base: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: SecretString,
    pub razorpay_api_base: String,
    pub google_userinfo_url: String,
    pub nats_url: Option<String>,
    pub currency: String,
    pub delivery_charge: Decimal,
    pub reconcile_interval_secs: u64,
    pub reconcile_stale_after_mins: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = get_env_or_default("ENVIRONMENT", "development");
        let client_url = get_env_or_default("CLIENT_URL", "http://localhost:5173").trim_end_matches('/').to_string();
        let allowed_origins = get_optional_env("ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|o| o.trim().to_string()).filter(|o| !o.is_empty()).collect())
            .unwrap_or_else(|| vec![client_url.clone()]);

        Ok(Self {
            database_url: SecretString::from(get_required_env("DATABASE_URL")?),
            port: parse_or_default("PORT", 5000)?,
            client_url,
            allowed_origins,
            access_token_secret: require_secret("ACCESS_TOKEN_SECRET", &environment)?,
            stripe_secret_key: require_secret("STRIPE_SECRET_KEY", &environment)?,
            stripe_api_base: get_env_or_default("STRIPE_API_BASE", STRIPE_API_BASE),
            razorpay_key_id: get_optional_env("RAZORPAY_KEY_ID").unwrap_or_default(),
            razorpay_key_secret: require_secret("RAZORPAY_KEY_SECRET", &environment)?,
            razorpay_api_base: get_env_or_default("RAZORPAY_API_BASE", RAZORPAY_API_BASE),
            google_userinfo_url: get_env_or_default("GOOGLE_USERINFO_URL", DEFAULT_USERINFO_URL),
            nats_url: get_optional_env("NATS_URL"),
            currency: get_env_or_default("CURRENCY", "inr").to_lowercase(),
            delivery_charge: parse_or_default("DELIVERY_CHARGE", Decimal::TEN)?,
            reconcile_interval_secs: parse_or_default("RECONCILE_INTERVAL_SECS", 600)?,
            reconcile_stale_after_mins: parse_positive_or_default("RECONCILE_STALE_AFTER_MINS", 120)?,
            environment,
        })
    }

    pub fn is_development(&self) -> bool { self.environment == "development" }
}

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_or_default<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match get_optional_env(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidEnvVar(key.to_string(), raw)),
        None => Ok(default),
    }
}

/// A zero or negative value is refused.
fn parse_positive_or_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    match parse_or_default(key, default)? {
        0 => Err(ConfigError::InvalidEnvVar(key.to_string(), "0".to_string())),
        value => Ok(value),
    }
}

/// Must be set and non-empty outside development.
fn require_secret(key: &str, environment: &str) -> Result<SecretString, ConfigError> {
    match get_optional_env(key) {
        Some(value) => Ok(SecretString::from(value)),
        None if environment == "development" => Ok(SecretString::from(format!("dev-{key}-not-for-production"))),
        None => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}
