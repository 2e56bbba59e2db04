//! Order Aggregate
//!
//! Status flow: `pending -> processing -> shipped -> delivered`, with
//! `pending | processing -> cancelled` and `delivered -> returned`.
//! Payment status moves independently: `pending -> paid | failed`.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::MoneyError;

/// Orders older than this can no longer be cancelled by the customer.
pub const CANCEL_WINDOW_DAYS: i64 = 6;
/// Returns are accepted for this long after delivery.
pub const RETURN_WINDOW_DAYS: i64 = 7;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled, Returned }

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [Self::Pending, Self::Processing, Self::Shipped, Self::Delivered, Self::Cancelled, Self::Returned];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|st| st.as_str() == s).ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { CashOnDelivery, Stripe, Razorpay }

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self { Self::CashOnDelivery => "cash_on_delivery", Self::Stripe => "stripe", Self::Razorpay => "razorpay" }
    }
}

impl FromStr for PaymentMethod {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash_on_delivery" => Ok(Self::CashOnDelivery),
            "stripe" => Ok(Self::Stripe),
            "razorpay" => Ok(Self::Razorpay),
            other => Err(OrderError::UnknownPaymentMethod(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus { #[default] Pending, Paid, Failed }

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Paid => "paid", Self::Failed => "failed" }
    }
}

impl FromStr for PaymentStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

/// Price is captured when the order is placed and never follows later catalog changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product: Uuid,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: u32,
    pub price: Decimal,
}

impl LineItem {
    pub fn line_total(&self) -> Result<Decimal, MoneyError> {
        self.price.checked_mul(Decimal::from(self.quantity)).ok_or(MoneyError::OutOfRange(self.price))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub zip_code: String,
    pub state: String,
    pub country: String,
}

impl Address {
    pub fn is_blank(&self) -> bool {
        [&self.street, &self.city, &self.zip_code, &self.state, &self.country].iter().all(|f| f.trim().is_empty())
    }
}

/// Input common to every checkout path.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub user: Uuid,
    pub products: Vec<LineItem>,
    pub total_amount: Decimal,
    pub address: Address,
    pub payment_method: PaymentMethod,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user: Uuid,
    pub products: Vec<LineItem>,
    pub total_amount: Decimal,
    pub address: Address,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub is_returned: bool,
    pub is_cancelled: bool,
    pub stripe_session_id: Option<String>,
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub razorpay_signature: Option<String>,
    /// Optimistic concurrency counter; bumped by every successful store update.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<DomainEvent>,
}

impl Order {
    /// Validates checkout input and opens a `pending` order awaiting payment.
    pub fn place(input: NewOrder, now: DateTime<Utc>) -> Result<Self, OrderError> {
        if input.products.is_empty() { return Err(OrderError::NoItems); }
        if input.products.iter().any(|i| i.quantity == 0) { return Err(OrderError::InvalidQuantity); }
        if input.products.iter().any(|i| i.price.is_sign_negative()) { return Err(OrderError::InvalidPrice); }
        if input.total_amount <= Decimal::ZERO { return Err(OrderError::InvalidTotal); }
        if input.address.is_blank() { return Err(OrderError::MissingAddress); }
        let id = Uuid::now_v7();
        let mut order = Self {
            id, user: input.user, products: input.products, total_amount: input.total_amount,
            address: input.address, status: OrderStatus::Pending, payment_method: input.payment_method,
            payment_status: PaymentStatus::Pending, delivered_at: None, is_returned: false, is_cancelled: false,
            stripe_session_id: None, razorpay_order_id: None, razorpay_payment_id: None, razorpay_signature: None,
            version: 0, created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Created {
            order_id: id, user_id: order.user, method: order.payment_method, total: order.total_amount,
        }));
        Ok(order)
    }

    /// Unpaid and still in its initial state; only such orders may be swept.
    pub fn is_awaiting_payment(&self) -> bool {
        self.payment_status == PaymentStatus::Pending && self.status == OrderStatus::Pending && !self.is_cancelled
    }

    pub fn attach_checkout_session(&mut self, session_id: impl Into<String>, now: DateTime<Utc>) {
        self.stripe_session_id = Some(session_id.into());
        self.touch(now);
    }

    pub fn attach_gateway_order(&mut self, provider_order_id: impl Into<String>) {
        self.razorpay_order_id = Some(provider_order_id.into());
    }

    /// Marks payment received. Returns `false` when the order was already paid.
    pub fn mark_paid(&mut self, now: DateTime<Utc>) -> bool {
        if self.payment_status == PaymentStatus::Paid { return false; }
        self.payment_status = PaymentStatus::Paid;
        self.touch(now);
        self.raise_event(DomainEvent::Order(OrderEvent::Paid { order_id: self.id, method: self.payment_method }));
        true
    }

    /// Gateway payment whose signature has been verified.
    pub fn record_gateway_payment(&mut self, payment_id: impl Into<String>, signature: impl Into<String>, now: DateTime<Utc>) -> bool {
        if !self.mark_paid(now) { return false; }
        self.razorpay_payment_id = Some(payment_id.into());
        self.razorpay_signature = Some(signature.into());
        true
    }

    pub fn mark_payment_failed(&mut self, now: DateTime<Utc>) {
        self.payment_status = PaymentStatus::Failed;
        self.touch(now);
        self.raise_event(DomainEvent::Order(OrderEvent::PaymentFailed { order_id: self.id, method: self.payment_method }));
    }

    /// Customer cancellation: only before shipping and within the cancel window.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        if self.is_cancelled || self.status == OrderStatus::Cancelled { return Err(OrderError::AlreadyCancelled); }
        if !matches!(self.status, OrderStatus::Pending | OrderStatus::Processing) {
            return Err(OrderError::CannotCancel(self.status));
        }
        if now - self.created_at > Duration::days(CANCEL_WINDOW_DAYS) { return Err(OrderError::CancelWindowExpired); }
        self.status = OrderStatus::Cancelled;
        self.is_cancelled = true;
        self.touch(now);
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id }));
        Ok(())
    }

    /// Customer return: only once, only after delivery, within the return window.
    pub fn mark_returned(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        if self.is_returned || self.status == OrderStatus::Returned { return Err(OrderError::AlreadyReturned); }
        let delivered_at = match (self.status, self.delivered_at) {
            (OrderStatus::Delivered, Some(at)) => at,
            _ => return Err(OrderError::NotDelivered),
        };
        if now - delivered_at > Duration::days(RETURN_WINDOW_DAYS) { return Err(OrderError::ReturnWindowExpired); }
        self.status = OrderStatus::Returned;
        self.is_returned = true;
        self.touch(now);
        self.raise_event(DomainEvent::Order(OrderEvent::Returned { order_id: self.id }));
        Ok(())
    }

    /// Administrative override. Any known status may be set; `delivered`
    /// stamps the delivery time that opens the return window.
    pub fn set_status(&mut self, status: OrderStatus, now: DateTime<Utc>) {
        let from = self.status;
        self.status = status;
        if status == OrderStatus::Delivered { self.delivered_at = Some(now); }
        self.touch(now);
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from, to: status }));
    }

    /// Records that the order is being removed rather than kept as failed.
    /// A paid order is never discarded.
    pub fn discard(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        if self.payment_status == PaymentStatus::Paid { return Err(OrderError::AlreadyPaid); }
        self.raise_event(DomainEvent::Order(OrderEvent::Discarded { order_id: self.id, reason: reason.into() }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self, now: DateTime<Utc>) { self.updated_at = now; }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("Order must contain at least one product")]
    NoItems,
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("Price must not be negative")]
    InvalidPrice,
    #[error("Total amount must be positive")]
    InvalidTotal,
    #[error("Shipping address is required")]
    MissingAddress,
    #[error("Unknown payment method: {0}")]
    UnknownPaymentMethod(String),
    #[error("Unknown status: {0}")]
    UnknownStatus(String),
    #[error("Order is already cancelled")]
    AlreadyCancelled,
    #[error("Cannot cancel an order that is {0}")]
    CannotCancel(OrderStatus),
    #[error("Cancellation window has expired")]
    CancelWindowExpired,
    #[error("Order has already been returned")]
    AlreadyReturned,
    #[error("Order not delivered yet")]
    NotDelivered,
    #[error("Return window expired")]
    ReturnWindowExpired,
    #[error("Order has already been paid")]
    AlreadyPaid,
}
