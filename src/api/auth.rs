use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::{get, post}, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::ValidJson;
use crate::auth::{AuthUser, ACCESS_TOKEN_COOKIE, TOKEN_TTL_DAYS};
use crate::domain::aggregates::Account;
use crate::error::AppResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/adlogin", post(admin_login))
        .route("/google-signup", post(google_signup))
        .route("/logout", post(logout))
        .route("/profile", get(profile))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GoogleSignupRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::days(TOKEN_TTL_DAYS))
        .build()
}

fn sign_in(state: &AppState, jar: CookieJar, account: &Account) -> AppResult<CookieJar> {
    let token = state.tokens.issue(account.id)?;
    Ok(jar.add(session_cookie(token, state.secure_cookies)))
}

async fn signup(State(state): State<AppState>, jar: CookieJar, ValidJson(body): ValidJson<SignupRequest>) -> AppResult<impl IntoResponse> {
    let account = state.accounts.signup(&body.name, &body.email, &body.password).await?;
    let jar = sign_in(&state, jar, &account)?;
    Ok((StatusCode::CREATED, jar, Json(json!({ "message": "User registered successfully.", "user": account }))))
}

async fn login(State(state): State<AppState>, jar: CookieJar, ValidJson(body): ValidJson<LoginRequest>) -> AppResult<impl IntoResponse> {
    let account = state.accounts.login(&body.email, &body.password).await?;
    let jar = sign_in(&state, jar, &account)?;
    tracing::info!(user_id = %account.id, "Logged in");
    Ok((jar, Json(json!({ "message": "Logged in successfully.", "user": account }))))
}

async fn admin_login(State(state): State<AppState>, jar: CookieJar, ValidJson(body): ValidJson<LoginRequest>) -> AppResult<impl IntoResponse> {
    let account = state.accounts.admin_login(&body.email, &body.password).await?;
    let jar = sign_in(&state, jar, &account)?;
    tracing::info!(user_id = %account.id, "Admin logged in");
    Ok((jar, Json(json!({ "success": true, "message": "Admin logged in successfully.", "user": account }))))
}

async fn google_signup(State(state): State<AppState>, jar: CookieJar, ValidJson(body): ValidJson<GoogleSignupRequest>) -> AppResult<impl IntoResponse> {
    let account = state.accounts.google_sign_in(&body.token).await?;
    let jar = sign_in(&state, jar, &account)?;
    Ok((jar, Json(json!({ "message": "Google login successful.", "user": account }))))
}

async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"));
    (jar, Json(json!({ "message": "Logged out successfully." })))
}

async fn profile(AuthUser(account): AuthUser) -> Json<serde_json::Value> {
    Json(json!({ "user": account }))
}
