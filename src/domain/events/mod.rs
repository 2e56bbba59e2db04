//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{OrderStatus, PaymentMethod};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

impl DomainEvent {
    /// Message-bus subject, e.g. `orders.paid`.
    pub fn subject(&self) -> String {
        match self {
            Self::Product(e) => format!("products.{}", e.kind()),
            Self::Order(e) => format!("orders.{}", e.kind()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: Uuid },
    Deleted { product_id: Uuid },
    ReviewAdded { product_id: Uuid, reviewer: Uuid, rating: u8, average_rating: f64 },
}

impl ProductEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Deleted { .. } => "deleted",
            Self::ReviewAdded { .. } => "review_added",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: Uuid, user_id: Uuid, method: PaymentMethod, total: Decimal },
    Paid { order_id: Uuid, method: PaymentMethod },
    PaymentFailed { order_id: Uuid, method: PaymentMethod },
    Cancelled { order_id: Uuid },
    Returned { order_id: Uuid },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    Discarded { order_id: Uuid, reason: String },
}

impl OrderEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Paid { .. } => "paid",
            Self::PaymentFailed { .. } => "payment_failed",
            Self::Cancelled { .. } => "cancelled",
            Self::Returned { .. } => "returned",
            Self::StatusChanged { .. } => "status_changed",
            Self::Discarded { .. } => "discarded",
        }
    }
}
