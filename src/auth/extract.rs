use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use axum_extra::extract::cookie::CookieJar;

use super::AuthError;
use crate::domain::aggregates::Account;
use crate::error::AppError;
use crate::state::AppState;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// The authenticated caller, loaded from the access token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Account);

/// An authenticated caller with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Account);

/// Cookie first, then `Authorization: Bearer`.
fn bearer_token(parts: &Parts) -> Option<String> {
    if let Some(cookie) = CookieJar::from_headers(&parts.headers).get(ACCESS_TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }
    parts.headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        let account_id = state.tokens.verify(&token)?;
        let account = state.accounts.find(account_id).await?.ok_or(AuthError::UnknownAccount)?;
        Ok(Self(account))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(account) = AuthUser::from_request_parts(parts, state).await?;
        if !account.is_admin() {
            tracing::warn!(user_id = %account.id, "Admin route refused");
            return Err(AuthError::AdminOnly.into());
        }
        Ok(Self(account))
    }
}
