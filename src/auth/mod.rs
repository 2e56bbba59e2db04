//! Authentication: password hashing, access tokens, federated sign-in and
//! the request extractors that attach the caller's account.

mod extract;
mod google;
mod password;
mod token;

pub use extract::{AdminUser, AuthUser, ACCESS_TOKEN_COOKIE};
pub use google::{GoogleIdentity, GoogleProfile, IdentityProvider, DEFAULT_USERINFO_URL};
pub use password::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
pub use token::{Claims, TokenIssuer, TOKEN_TTL_DAYS};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Account no longer exists")]
    UnknownAccount,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Access denied. Admin only")]
    AdminOnly,
    #[error("Email already in use")]
    EmailTaken,
    #[error("Password must be at least {0} characters")]
    WeakPassword(usize),
    #[error("Google token is invalid or expired")]
    FederatedRejected,
    #[error("Google profile is missing email or subject")]
    FederatedIncomplete,
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("Token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}
