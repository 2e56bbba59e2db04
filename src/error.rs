//! Unified error handling.
//!
//! Services and handlers return `AppResult<T>`. Server-side faults are
//! logged with detail; clients only get a generic message for them.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::auth::AuthError;
use crate::domain::aggregates::{CartError, OrderError, ProductError};
use crate::domain::value_objects::MoneyError;
use crate::payments::PaymentError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Payment provider error: {0}")]
    Payment(#[from] PaymentError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Money(#[from] MoneyError),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(StoreError::Conflict) | Self::Store(StoreError::Duplicate(_)) => StatusCode::CONFLICT,
            Self::Store(_) | Self::Payment(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::MissingToken | AuthError::InvalidToken | AuthError::UnknownAccount
                | AuthError::InvalidCredentials | AuthError::FederatedRejected => StatusCode::UNAUTHORIZED,
                AuthError::AdminOnly => StatusCode::FORBIDDEN,
                AuthError::EmailTaken => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::FederatedIncomplete => StatusCode::BAD_REQUEST,
                AuthError::Hashing(_) | AuthError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Cart(CartError::ItemNotFound) => StatusCode::NOT_FOUND,
            Self::Order(_) | Self::Product(_) | Self::Money(_) | Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Store(StoreError::Conflict) => "Order was modified concurrently, please retry".to_string(),
            Self::Store(StoreError::Duplicate(_)) => "Email already in use".to_string(),
            Self::Store(_) => "Internal server error".to_string(),
            Self::Payment(_) => "Payment provider error".to_string(),
            Self::Auth(AuthError::Hashing(_) | AuthError::Signing(_)) => "Internal server error".to_string(),
            Self::Auth(AuthError::MissingToken) => "Unauthorized - No token provided".to_string(),
            Self::Auth(AuthError::InvalidToken | AuthError::UnknownAccount) => {
                "Unauthorized - Invalid or expired token".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request error");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }
        let body = Json(serde_json::json!({ "success": false, "message": self.client_message() }));
        (status, body).into_response()
    }
}
