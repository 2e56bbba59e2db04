use async_trait::async_trait;
use serde::Deserialize;

use super::AuthError;
use crate::payments::REQUEST_TIMEOUT;

pub const DEFAULT_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GoogleProfile {
    pub email: Option<String>,
    pub name: Option<String>,
    pub sub: Option<String>,
}

/// Resolves a client-held access token to the signed-in user's profile.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn profile(&self, access_token: &str) -> Result<GoogleProfile, AuthError>;
}

#[derive(Clone)]
pub struct GoogleIdentity {
    http: reqwest::Client,
    userinfo_url: String,
}

impl GoogleIdentity {
    pub fn new(userinfo_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            userinfo_url: userinfo_url.into(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentity {
    async fn profile(&self, access_token: &str) -> Result<GoogleProfile, AuthError> {
        let resp = self.http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Google userinfo request failed");
                AuthError::FederatedRejected
            })?;
        if !resp.status().is_success() {
            tracing::warn!(status = %resp.status(), "Google rejected access token");
            return Err(AuthError::FederatedRejected);
        }
        resp.json::<GoogleProfile>().await.map_err(|_| AuthError::FederatedRejected)
    }
}
