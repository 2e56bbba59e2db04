use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::ValidJson;
use crate::auth::AuthUser;
use crate::domain::aggregates::Cart;
use crate::error::AppResult;
use crate::services::CartLineView;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart))
        .route("/add", post(add_to_cart))
        .route("/removeone", post(remove_one))
        .route("/clear", delete(clear_cart))
        .route("/:id", put(update_quantity))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuantityRequest {
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: u32,
}

fn cart_response(cart: Cart) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "cartItems": cart }))
}

async fn get_cart(State(state): State<AppState>, AuthUser(user): AuthUser) -> AppResult<Json<Vec<CartLineView>>> {
    Ok(Json(state.carts.view(&user).await?))
}

async fn add_to_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(body): ValidJson<CartItemRequest>,
) -> AppResult<Json<serde_json::Value>> {
    Ok(cart_response(state.carts.add(&user, body.product_id, body.size).await?))
}

async fn update_quantity(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(product_id): Path<Uuid>,
    ValidJson(body): ValidJson<UpdateQuantityRequest>,
) -> AppResult<Json<serde_json::Value>> {
    Ok(cart_response(state.carts.update_quantity(&user, product_id, body.size, body.quantity).await?))
}

async fn remove_one(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(body): ValidJson<CartItemRequest>,
) -> AppResult<Json<serde_json::Value>> {
    Ok(cart_response(state.carts.remove_one(&user, body.product_id, body.size).await?))
}

async fn clear_cart(State(state): State<AppState>, AuthUser(user): AuthUser) -> AppResult<Json<serde_json::Value>> {
    Ok(cart_response(state.carts.clear(user.id).await?))
}
