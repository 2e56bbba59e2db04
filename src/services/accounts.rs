use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{hash_password, verify_password, AuthError, IdentityProvider};
use crate::domain::aggregates::Account;
use crate::domain::value_objects::Email;
use crate::error::{AppError, AppResult};
use crate::store::{AccountStore, StoreError};

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    identity: Arc<dyn IdentityProvider>,
}

fn parse_email(raw: &str) -> AppResult<Email> {
    Email::new(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { store, identity }
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> AppResult<Account> {
        let email = parse_email(email)?;
        if self.store.find_account_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken.into());
        }
        let account = Account::register(name.trim(), email, hash_password(password)?);
        self.store.insert_account(&account).await.map_err(|e| match e {
            StoreError::Duplicate(_) => AppError::from(AuthError::EmailTaken),
            other => other.into(),
        })?;
        tracing::info!(user_id = %account.id, "Account registered");
        Ok(account)
    }

    /// Password login. Federated accounts have no password and cannot use it.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<Account> {
        let email = parse_email(email).map_err(|_| AuthError::InvalidCredentials)?;
        let account = self.store.find_account_by_email(&email).await?.ok_or(AuthError::InvalidCredentials)?;
        match &account.password_hash {
            Some(hash) if verify_password(password, hash) => Ok(account),
            _ => Err(AuthError::InvalidCredentials.into()),
        }
    }

    /// Non-admin accounts are refused before the password is checked.
    pub async fn admin_login(&self, email: &str, password: &str) -> AppResult<Account> {
        let email = parse_email(email).map_err(|_| AuthError::AdminOnly)?;
        let account = self.store.find_account_by_email(&email).await?.ok_or(AuthError::AdminOnly)?;
        if !account.is_admin() {
            tracing::warn!(user_id = %account.id, "Admin login refused for non-admin account");
            return Err(AuthError::AdminOnly.into());
        }
        match &account.password_hash {
            Some(hash) if verify_password(password, hash) => Ok(account),
            _ => Err(AuthError::InvalidCredentials.into()),
        }
    }

    /// Finds the account by the Google profile's email, creating a federated one on first sign-in.
    pub async fn google_sign_in(&self, access_token: &str) -> AppResult<Account> {
        let profile = self.identity.profile(access_token).await?;
        let (Some(email), Some(sub)) = (profile.email, profile.sub) else {
            return Err(AuthError::FederatedIncomplete.into());
        };
        let email = Email::new(email).map_err(|_| AuthError::FederatedIncomplete)?;
        if let Some(existing) = self.store.find_account_by_email(&email).await? {
            return Ok(existing);
        }
        let name = profile.name.unwrap_or_else(|| email.as_str().split('@').next().unwrap_or_default().to_string());
        let account = Account::federated(name, email, sub);
        self.store.insert_account(&account).await?;
        tracing::info!(user_id = %account.id, "Federated account created");
        Ok(account)
    }

    pub async fn find(&self, id: Uuid) -> AppResult<Option<Account>> {
        Ok(self.store.find_account(id).await?)
    }

    pub async fn list(&self) -> AppResult<Vec<Account>> {
        Ok(self.store.list_accounts().await?)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.store.delete_account(id).await? {
            return Err(AppError::NotFound("User"));
        }
        tracing::info!(user_id = %id, "Account deleted");
        Ok(())
    }
}
