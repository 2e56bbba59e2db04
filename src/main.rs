//! Storefront backend server

use anyhow::Result;
use axum::http::{header, HeaderValue, Method};
use chrono::{Duration, Utc};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_backend::{
    api,
    auth::{GoogleIdentity, TokenIssuer},
    config::Config,
    payments::{RazorpayClient, StripeClient},
    services::{AccountService, CartService, CatalogService, EventPublisher, OrderService, OrderSettings},
    state::AppState,
    store::PgStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(config.database_url.expose_secret())
        .await?;
    let store = Arc::new(PgStore::new(pool));
    store.migrate().await?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, domain events will only be logged");
                None
            }
        },
        None => None,
    };
    let events = EventPublisher::new(nats);

    let checkout = Arc::new(StripeClient::new(config.stripe_secret_key.clone(), config.stripe_api_base.clone())?);
    let gateway = Arc::new(RazorpayClient::new(
        config.razorpay_key_id.clone(),
        config.razorpay_key_secret.clone(),
        config.razorpay_api_base.clone(),
    )?);
    let identity = Arc::new(GoogleIdentity::new(config.google_userinfo_url.clone())?);

    let orders = OrderService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        checkout,
        gateway,
        events.clone(),
        OrderSettings {
            client_url: config.client_url.clone(),
            delivery_charge: config.delivery_charge,
            currency: config.currency.clone(),
        },
    );
    let state = AppState {
        accounts: AccountService::new(store.clone(), identity),
        catalog: CatalogService::new(store.clone(), events),
        carts: CartService::new(store.clone(), store.clone()),
        orders: orders.clone(),
        tokens: TokenIssuer::new(config.access_token_secret.clone()),
        secure_cookies: !config.is_development(),
    };

    spawn_reconciler(orders, config.reconcile_interval_secs, config.reconcile_stale_after_mins);

    let origins: Vec<HeaderValue> = config.allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    let app = api::router(state).layer(cors);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(%addr, environment = %config.environment, "Storefront backend listening");
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}

fn spawn_reconciler(orders: OrderService, interval_secs: u64, stale_after_mins: u32) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match orders.reconcile(Utc::now(), Duration::minutes(i64::from(stale_after_mins))).await {
                Ok(report) if report == Default::default() => tracing::debug!("Reconciliation found nothing to repair"),
                Ok(report) => tracing::info!(
                    discarded = report.discarded, failed = report.failed, relinked = report.relinked,
                    "Reconciliation sweep finished"
                ),
                Err(e) => tracing::error!(error = %e, "Reconciliation sweep failed"),
            }
        }
    });
}
