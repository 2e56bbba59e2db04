use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::domain::aggregates::Account;
use crate::error::AppResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/getusers", get(list_users))
        .route("/dltuser/:id", delete(delete_user))
}

async fn list_users(State(state): State<AppState>, AdminUser(_admin): AdminUser) -> AppResult<Json<Vec<Account>>> {
    Ok(Json(state.accounts.list().await?))
}

async fn delete_user(State(state): State<AppState>, AdminUser(_admin): AdminUser, Path(id): Path<Uuid>) -> AppResult<Json<serde_json::Value>> {
    state.accounts.delete(id).await?;
    Ok(Json(json!({ "message": "User deleted successfully" })))
}
