//! Account Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::cart::Cart;
use crate::domain::value_objects::Email;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Customer => "customer", Self::Admin => "admin" }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = UnknownRole;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Self::Customer),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: Email,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub role: Role,
    #[serde(rename = "cartItems")]
    pub cart: Cart,
    pub orders: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Account created through email/password signup.
    pub fn register(name: impl Into<String>, email: Email, password_hash: String) -> Self {
        Self::new(name.into(), email, Some(password_hash), None)
    }

    /// Account created on first federated sign-in; carries no password.
    pub fn federated(name: impl Into<String>, email: Email, google_id: impl Into<String>) -> Self {
        Self::new(name.into(), email, None, Some(google_id.into()))
    }

    fn new(name: String, email: Email, password_hash: Option<String>, google_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), name, email, password_hash, google_id,
            role: Role::Customer, cart: Cart::new(), orders: vec![],
            created_at: now, updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    /// Records an order reference once.
    pub fn link_order(&mut self, order_id: Uuid) -> bool {
        if self.orders.contains(&order_id) { return false; }
        self.orders.push(order_id);
        self.updated_at = Utc::now();
        true
    }

    /// Summary exposed alongside orders in admin listings.
    pub fn summary(&self) -> AccountSummary {
        AccountSummary { id: self.id, name: self.name.clone(), email: self.email.to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}
