use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::ValidJson;
use crate::auth::{AdminUser, AuthUser};
use crate::domain::aggregates::{Address, CartItem, LineItem, NewOrder, OrderStatus, PaymentMethod};
use crate::error::{AppError, AppResult};
use crate::services::{GatewayVerification, HostedVerification};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/list", get(all_orders))
        .route("/status", put(update_status))
        .route("/cancel", post(cancel_order))
        .route("/return", post(return_order))
        .route("/cod", post(place_order))
        .route("/stripe", post(place_order_stripe))
        .route("/verifyStripe", post(verify_stripe))
        .route("/razorpay", post(place_order_razorpay))
        .route("/verifyRazorpay", post(verify_razorpay))
        .route("/user/:id", get(user_orders))
        .route("/:user_id/:order_id", get(single_order))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, message = "All fields are required"))]
    pub products: Vec<LineItem>,
    pub total_amount: Decimal,
    pub address: Address,
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// Client prices are ignored on this path.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct HostedOrderRequest {
    #[validate(length(min = 1, message = "All fields are required"))]
    pub products: Vec<CartItem>,
    pub address: Address,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyStripeRequest {
    pub order_id: Uuid,
    /// `true` or `"true"` confirms; anything else abandons the order.
    #[serde(default)]
    pub success: serde_json::Value,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyRazorpayRequest {
    #[serde(rename = "orderId")]
    pub order_id: Uuid,
    #[validate(length(min = 1))]
    pub razorpay_order_id: String,
    #[validate(length(min = 1))]
    pub razorpay_payment_id: String,
    #[validate(length(min = 1))]
    pub razorpay_signature: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderIdRequest {
    pub order_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub order_id: Uuid,
    #[validate(length(min = 1))]
    pub status: String,
}

async fn place_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(body): ValidJson<PlaceOrderRequest>,
) -> AppResult<impl IntoResponse> {
    let method: PaymentMethod = body.payment_method
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("All fields are required".to_string()))?
        .parse()?;
    let order = state.orders.place_cash(NewOrder {
        user: user.id,
        products: body.products,
        total_amount: body.total_amount,
        address: body.address,
        payment_method: method,
    }).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "message": "Order placed successfully", "order": order }))))
}

async fn place_order_stripe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(body): ValidJson<HostedOrderRequest>,
) -> AppResult<impl IntoResponse> {
    let (order, session) = state.orders.place_hosted(user.id, body.products, body.address).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "sessionId": session.id, "url": session.url, "order": order }))))
}

async fn verify_stripe(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(body): ValidJson<VerifyStripeRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let success = matches!(&body.success, serde_json::Value::Bool(true))
        || body.success.as_str() == Some("true");
    Ok(Json(match state.orders.verify_hosted(user.id, body.order_id, success).await? {
        HostedVerification::Paid(_) => json!({ "success": true, "message": "Payment verified and cart cleared" }),
        HostedVerification::Discarded => json!({ "success": false, "message": "Payment failed. Order deleted" }),
    }))
}

async fn place_order_razorpay(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(body): ValidJson<PlaceOrderRequest>,
) -> AppResult<impl IntoResponse> {
    let (order, gateway_order) = state.orders.place_gateway(NewOrder {
        user: user.id,
        products: body.products,
        total_amount: body.total_amount,
        address: body.address,
        payment_method: PaymentMethod::Razorpay,
    }).await?;
    Ok((StatusCode::CREATED, Json(json!({
        "success": true,
        "orderId": gateway_order.id,
        "amount": gateway_order.amount,
        "currency": gateway_order.currency,
        "order": order,
    }))))
}

async fn verify_razorpay(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(body): ValidJson<VerifyRazorpayRequest>,
) -> AppResult<Response> {
    let outcome = state.orders.verify_gateway(
        user.id,
        body.order_id,
        &body.razorpay_order_id,
        &body.razorpay_payment_id,
        &body.razorpay_signature,
    ).await?;
    Ok(match outcome {
        GatewayVerification::Paid(_) => {
            Json(json!({ "success": true, "message": "Payment verified successfully" })).into_response()
        }
        GatewayVerification::Failed(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "Payment verification failed" })),
        ).into_response(),
    })
}

async fn cancel_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(body): ValidJson<OrderIdRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let order = state.orders.cancel(user.id, body.order_id).await?;
    Ok(Json(json!({ "success": true, "message": "Order cancelled successfully", "order": order })))
}

async fn return_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(body): ValidJson<OrderIdRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let order = state.orders.return_order(user.id, body.order_id).await?;
    Ok(Json(json!({ "success": true, "message": "Product returned successfully", "order": order })))
}

async fn update_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ValidJson(body): ValidJson<UpdateStatusRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let status: OrderStatus = body.status.parse()?;
    let order = state.orders.set_status(body.order_id, status).await?;
    Ok(Json(json!({ "success": true, "message": "Status updated", "order": order })))
}

async fn all_orders(State(state): State<AppState>, AdminUser(_admin): AdminUser) -> AppResult<Json<serde_json::Value>> {
    let orders = state.orders.list_all().await?;
    Ok(Json(json!({ "success": true, "count": orders.len(), "data": orders })))
}

/// Callers may list their own orders; admins may list anyone's.
async fn user_orders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    if id != user.id && !user.is_admin() {
        return Err(AppError::Forbidden("You can only view your own orders".to_string()));
    }
    let orders = state.orders.list_for_account(id).await?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}

async fn single_order(
    State(state): State<AppState>,
    Path((user_id, order_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<serde_json::Value>> {
    let order = state.orders.find_for_account(user_id, order_id).await?;
    Ok(Json(json!({ "order": order })))
}
