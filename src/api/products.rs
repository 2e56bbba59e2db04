use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use super::ValidJson;
use crate::auth::{AdminUser, AuthUser};
use crate::domain::aggregates::{ProductDraft, ProductUpdate};
use crate::domain::value_objects::Rating;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::store::ProductFilter;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_product))
        .route("/getsingle", post(single_product))
        .route("/all", get(list_products))
        .route("/bestseller", get(list_bestsellers))
        .route("/category/:category", get(list_by_category))
        .route("/product/:id", put(update_product))
        .route("/remove/:id", delete(delete_product))
        .route("/featured/:id", patch(toggle_featured))
        .route("/:id/reviews", post(add_review))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "Name and price are required."))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub bestseller: bool,
    #[serde(default)]
    #[validate(length(max = 4, message = "At most 4 images are allowed"))]
    pub image: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub sizes: Option<Vec<String>>,
    pub bestseller: Option<bool>,
    #[validate(length(max = 4, message = "At most 4 images are allowed"))]
    pub image: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SingleProductRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: u8,
    pub comment: Option<String>,
}

async fn create_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ValidJson(body): ValidJson<CreateProductRequest>,
) -> AppResult<impl IntoResponse> {
    let product = state.catalog.create(ProductDraft {
        name: body.name,
        description: body.description,
        price: body.price,
        category: body.category,
        sub_category: body.sub_category,
        sizes: body.sizes,
        images: body.image,
        bestseller: body.bestseller,
    }).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "message": "Product created successfully.", "product": product }))))
}

async fn single_product(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ValidJson(body): ValidJson<SingleProductRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let product = state.catalog.get(body.product_id).await?;
    Ok(Json(json!({ "message": "Product retrieved successfully", "product": product })))
}

async fn list_products(State(state): State<AppState>, AuthUser(_user): AuthUser) -> AppResult<Json<serde_json::Value>> {
    let products = state.catalog.list(ProductFilter::All).await?;
    Ok(Json(json!({ "success": true, "message": "Products retrieved successfully.", "products": products })))
}

async fn list_bestsellers(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    let products = state.catalog.list(ProductFilter::Bestsellers).await?;
    Ok(Json(json!({ "success": true, "message": "Bestseller products fetched successfully", "data": products })))
}

async fn list_by_category(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Path(category): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let products = state.catalog.list(ProductFilter::Category(category)).await?;
    Ok(Json(json!(products)))
}

async fn update_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    ValidJson(body): ValidJson<UpdateProductRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let product = state.catalog.update(id, ProductUpdate {
        name: body.name,
        description: body.description,
        price: body.price,
        category: body.category,
        sub_category: body.sub_category,
        sizes: body.sizes,
        images: body.image,
        bestseller: body.bestseller,
    }).await?;
    Ok(Json(json!({ "success": true, "message": "Product updated successfully.", "product": product })))
}

async fn delete_product(State(state): State<AppState>, AdminUser(_admin): AdminUser, Path(id): Path<Uuid>) -> AppResult<Json<serde_json::Value>> {
    state.catalog.delete(id).await?;
    Ok(Json(json!({ "success": true, "message": "Product deleted successfully" })))
}

async fn toggle_featured(State(state): State<AppState>, AdminUser(_admin): AdminUser, Path(id): Path<Uuid>) -> AppResult<Json<serde_json::Value>> {
    let product = state.catalog.toggle_featured(id).await?;
    Ok(Json(json!(product)))
}

async fn add_review(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    ValidJson(body): ValidJson<ReviewRequest>,
) -> AppResult<impl IntoResponse> {
    let rating = Rating::new(body.rating).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let product = state.catalog.add_review(id, &user, rating, body.comment).await?;
    Ok((StatusCode::CREATED, Json(json!({
        "message": "Review added",
        "product": { "reviews": product.reviews, "averageRating": product.average_rating },
    }))))
}
