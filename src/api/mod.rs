//! HTTP boundary: routes, request extractors and response shapes.

mod analytics;
mod auth;
mod cart;
mod orders;
mod products;

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    routing::get,
    Json, Router,
};
use serde::de::DeserializeOwned;
use tower_http::trace::TraceLayer;
use validator::Validate;

use crate::error::AppError;
use crate::state::AppState;

/// JSON body that has passed its `Validate` rules. Malformed bodies are a 400.
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-backend"})) }))
        .nest("/api/auth", auth::routes())
        .nest("/api/products", products::routes())
        .nest("/api/cart", cart::routes())
        .nest("/api/orders", orders::routes())
        .nest("/api/analytics", analytics::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
