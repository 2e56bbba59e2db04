//! Order lifecycle: checkout on three payment paths, payment verification,
//! customer cancel/return, admin status changes, listings and the
//! reconciliation sweep that repairs partially applied checkouts.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use super::EventPublisher;
use crate::domain::aggregates::{
    AccountSummary, Address, Cart, CartItem, LineItem, NewOrder, Order, OrderError, OrderStatus, PaymentMethod,
    PaymentStatus, ProductSummary,
};
use crate::domain::value_objects::{Money, MoneyError};
use crate::error::{AppError, AppResult};
use crate::payments::{CheckoutLine, CheckoutSession, GatewayOrder, HostedCheckout, SignedOrderGateway};
use crate::store::{AccountStore, CatalogStore, OrderStore, StoreError};

/// The gateway only settles in rupees.
pub const GATEWAY_CURRENCY: &str = "INR";
pub const DELIVERY_LINE_NAME: &str = "Delivery Charge";

#[derive(Clone, Debug)]
pub struct OrderSettings {
    /// Storefront base URL used for checkout redirects.
    pub client_url: String,
    pub delivery_charge: Decimal,
    /// Hosted checkout currency.
    pub currency: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemView {
    pub product: Option<ProductSummary>,
    pub product_id: Uuid,
    pub size: Option<String>,
    pub quantity: u32,
    pub price: Decimal,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum OrderOwner {
    Account(AccountSummary),
    Id(Uuid),
}

/// Order with product references resolved to display fields.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub user: OrderOwner,
    pub products: Vec<LineItemView>,
    pub total_amount: Decimal,
    pub address: Address,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub is_returned: bool,
    pub is_cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    fn new(order: Order, products: &HashMap<Uuid, ProductSummary>, owner: OrderOwner) -> Self {
        Self {
            id: order.id,
            user: owner,
            products: order.products.into_iter().map(|item| LineItemView {
                product: products.get(&item.product).cloned(),
                product_id: item.product,
                size: item.size,
                quantity: item.quantity,
                price: item.price,
            }).collect(),
            total_amount: order.total_amount,
            address: order.address,
            status: order.status,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            delivered_at: order.delivered_at,
            is_returned: order.is_returned,
            is_cancelled: order.is_cancelled,
            stripe_session_id: order.stripe_session_id,
            razorpay_order_id: order.razorpay_order_id,
            razorpay_payment_id: order.razorpay_payment_id,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug)]
pub enum HostedVerification {
    Paid(Order),
    Discarded,
}

#[derive(Debug)]
pub enum GatewayVerification {
    Paid(Order),
    Failed(Order),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub discarded: usize,
    pub failed: usize,
    pub relinked: usize,
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    accounts: Arc<dyn AccountStore>,
    catalog: Arc<dyn CatalogStore>,
    checkout: Arc<dyn HostedCheckout>,
    gateway: Arc<dyn SignedOrderGateway>,
    events: EventPublisher,
    settings: OrderSettings,
}

fn minor_units(amount: Decimal, currency: &str) -> Result<i64, MoneyError> {
    Money::new(amount, currency).minor_units()
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        accounts: Arc<dyn AccountStore>,
        catalog: Arc<dyn CatalogStore>,
        checkout: Arc<dyn HostedCheckout>,
        gateway: Arc<dyn SignedOrderGateway>,
        events: EventPublisher,
        settings: OrderSettings,
    ) -> Self {
        Self { orders, accounts, catalog, checkout, gateway, events, settings }
    }

    /// Cash on delivery. The client total is stored as given.
    pub async fn place_cash(&self, input: NewOrder) -> AppResult<Order> {
        if input.payment_method != PaymentMethod::CashOnDelivery {
            return Err(AppError::BadRequest(format!(
                "Cash checkout does not accept {} payments", input.payment_method.as_str()
            )));
        }
        let mut order = Order::place(input, Utc::now())?;
        self.orders.insert_order(&order).await?;
        self.link(&order).await;
        tracing::info!(order_id = %order.id, user_id = %order.user, "Cash order placed");
        self.events.publish_all(order.take_events()).await;
        Ok(order)
    }

    /// Hosted checkout. Prices come from the catalog, not the client, plus a
    /// delivery line. The order is stored before the session is requested and
    /// removed again if the provider call fails.
    pub async fn place_hosted(&self, user: Uuid, items: Vec<CartItem>, address: Address) -> AppResult<(Order, CheckoutSession)> {
        if items.is_empty() { return Err(OrderError::NoItems.into()); }
        let ids: Vec<Uuid> = items.iter().map(|i| i.product).collect();
        let catalog: HashMap<Uuid, _> = self.catalog.find_products(&ids).await?.into_iter().map(|p| (p.id, p)).collect();

        let currency = self.settings.currency.as_str();
        let mut products = Vec::with_capacity(items.len());
        let mut lines = Vec::with_capacity(items.len() + 1);
        for item in items {
            let product = catalog.get(&item.product).ok_or(AppError::NotFound("Product"))?;
            lines.push(CheckoutLine { name: product.name.clone(), unit_amount: minor_units(product.price, currency)?, quantity: item.quantity });
            products.push(LineItem { product: product.id, size: item.size, quantity: item.quantity, price: product.price });
        }
        lines.push(CheckoutLine {
            name: DELIVERY_LINE_NAME.to_string(),
            unit_amount: minor_units(self.settings.delivery_charge, currency)?,
            quantity: 1,
        });
        let total_amount = products.iter().try_fold(self.settings.delivery_charge, |acc, item| {
            let line = item.line_total()?;
            acc.checked_add(line).ok_or(MoneyError::OutOfRange(line))
        })?;

        let input = NewOrder { user, products, total_amount, address, payment_method: PaymentMethod::Stripe };
        let mut order = Order::place(input, Utc::now())?;
        self.orders.insert_order(&order).await?;

        let success_url = format!("{}/order-success/{}/{}", self.settings.client_url, user, order.id);
        let cancel_url = format!("{}/checkout", self.settings.client_url);
        let session = match self.checkout.create_session(&lines, currency, &success_url, &cancel_url).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(order_id = %order.id, user_id = %user, error = %e, "Checkout session failed, removing order");
                if let Err(del) = self.orders.delete_order(order.id, order.version).await {
                    tracing::error!(order_id = %order.id, error = %del, "Failed to remove order after session failure");
                }
                return Err(e.into());
            }
        };

        order.attach_checkout_session(session.id.clone(), Utc::now());
        self.orders.update_order(&mut order).await?;
        self.link(&order).await;
        tracing::info!(order_id = %order.id, user_id = %user, session_id = %session.id, "Hosted checkout order placed");
        self.events.publish_all(order.take_events()).await;
        Ok((order, session))
    }

    /// Confirms or abandons a hosted checkout. Success marks the order paid;
    /// anything else deletes it, unless it has already been paid.
    pub async fn verify_hosted(&self, user: Uuid, order_id: Uuid, success: bool) -> AppResult<HostedVerification> {
        let mut order = self.owned(user, order_id).await?;
        if order.payment_method != PaymentMethod::Stripe {
            return Err(AppError::BadRequest("Order was not placed through hosted checkout".to_string()));
        }

        if success {
            if order.mark_paid(Utc::now()) {
                self.orders.update_order(&mut order).await?;
                self.clear_cart(user).await;
                tracing::info!(order_id = %order.id, user_id = %user, "Hosted checkout payment confirmed");
                self.events.publish_all(order.take_events()).await;
            }
            return Ok(HostedVerification::Paid(order));
        }

        order.discard("hosted checkout not completed")?;
        if !self.orders.delete_order(order.id, order.version).await? {
            return Err(StoreError::Conflict.into());
        }
        tracing::warn!(order_id = %order.id, user_id = %user, "Hosted checkout failed, order deleted");
        self.events.publish_all(order.take_events()).await;
        Ok(HostedVerification::Discarded)
    }

    /// Gateway checkout. The amount is checked before the provider order is
    /// created; the local order is only stored once it carries the provider
    /// handle.
    pub async fn place_gateway(&self, input: NewOrder) -> AppResult<(Order, GatewayOrder)> {
        if input.payment_method != PaymentMethod::Razorpay {
            return Err(AppError::BadRequest(format!(
                "Gateway checkout does not accept {} payments", input.payment_method.as_str()
            )));
        }
        let now = Utc::now();
        let mut order = Order::place(input, now)?;
        let amount = minor_units(order.total_amount, GATEWAY_CURRENCY)?;
        let receipt = format!("order_rcptid_{}", now.timestamp_millis());
        let gateway_order = self.gateway.create_order(amount, GATEWAY_CURRENCY, &receipt).await?;

        order.attach_gateway_order(gateway_order.id.clone());
        self.orders.insert_order(&order).await?;
        self.link(&order).await;
        tracing::info!(order_id = %order.id, user_id = %order.user, gateway_order_id = %gateway_order.id, "Gateway order placed");
        self.events.publish_all(order.take_events()).await;
        Ok((order, gateway_order))
    }

    /// Verifies the client-reported payment against the provider order id
    /// stored on the order. A paid order stays paid.
    pub async fn verify_gateway(
        &self,
        user: Uuid,
        order_id: Uuid,
        provider_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> AppResult<GatewayVerification> {
        let mut order = self.owned(user, order_id).await?;
        if order.payment_method != PaymentMethod::Razorpay {
            return Err(AppError::BadRequest("Order was not placed through the payment gateway".to_string()));
        }
        let Some(stored) = order.razorpay_order_id.clone() else {
            return Err(AppError::BadRequest("Order has no gateway reference".to_string()));
        };
        if order.payment_status == PaymentStatus::Paid {
            return Ok(GatewayVerification::Paid(order));
        }

        let now = Utc::now();
        let valid = stored == provider_order_id && self.gateway.verify_signature(&stored, payment_id, signature);
        if valid {
            order.record_gateway_payment(payment_id, signature, now);
            self.orders.update_order(&mut order).await?;
            self.clear_cart(user).await;
            tracing::info!(order_id = %order.id, user_id = %user, "Gateway payment verified");
            self.events.publish_all(order.take_events()).await;
            Ok(GatewayVerification::Paid(order))
        } else {
            order.mark_payment_failed(now);
            self.orders.update_order(&mut order).await?;
            tracing::warn!(order_id = %order.id, user_id = %user, "Gateway signature mismatch, payment marked failed");
            self.events.publish_all(order.take_events()).await;
            Ok(GatewayVerification::Failed(order))
        }
    }

    pub async fn cancel(&self, user: Uuid, order_id: Uuid) -> AppResult<Order> {
        let mut order = self.owned(user, order_id).await?;
        order.cancel(Utc::now()).inspect_err(|e| {
            tracing::warn!(order_id = %order_id, user_id = %user, reason = %e, "Cancel refused");
        })?;
        self.orders.update_order(&mut order).await?;
        tracing::info!(order_id = %order.id, user_id = %user, "Order cancelled");
        self.events.publish_all(order.take_events()).await;
        Ok(order)
    }

    pub async fn return_order(&self, user: Uuid, order_id: Uuid) -> AppResult<Order> {
        let mut order = self.owned(user, order_id).await?;
        order.mark_returned(Utc::now()).inspect_err(|e| {
            tracing::warn!(order_id = %order_id, user_id = %user, reason = %e, "Return refused");
        })?;
        self.orders.update_order(&mut order).await?;
        tracing::info!(order_id = %order.id, user_id = %user, "Order returned");
        self.events.publish_all(order.take_events()).await;
        Ok(order)
    }

    /// Admin override; no transition rules beyond the status being known.
    pub async fn set_status(&self, order_id: Uuid, status: OrderStatus) -> AppResult<Order> {
        let mut order = self.orders.find_order(order_id).await?.ok_or(AppError::NotFound("Order"))?;
        order.set_status(status, Utc::now());
        self.orders.update_order(&mut order).await?;
        tracing::info!(order_id = %order.id, status = %status, "Order status updated");
        self.events.publish_all(order.take_events()).await;
        Ok(order)
    }

    /// Every order, with owners resolved to name and email.
    pub async fn list_all(&self) -> AppResult<Vec<OrderView>> {
        let orders = self.orders.list_orders().await?;
        let owner_ids: Vec<Uuid> = orders.iter().map(|o| o.user).collect::<HashSet<_>>().into_iter().collect();
        let owners: HashMap<Uuid, AccountSummary> = self.accounts.find_accounts(&owner_ids).await?
            .into_iter()
            .map(|a| (a.id, a.summary()))
            .collect();
        let products = self.product_summaries(&orders).await?;
        Ok(orders.into_iter().map(|o| {
            let owner = owners.get(&o.user).cloned().map_or(OrderOwner::Id(o.user), OrderOwner::Account);
            OrderView::new(o, &products, owner)
        }).collect())
    }

    pub async fn list_for_account(&self, user: Uuid) -> AppResult<Vec<OrderView>> {
        let orders = self.orders.list_orders_for_account(user).await?;
        let products = self.product_summaries(&orders).await?;
        Ok(orders.into_iter().map(|o| OrderView::new(o, &products, OrderOwner::Id(user))).collect())
    }

    pub async fn find_for_account(&self, user: Uuid, order_id: Uuid) -> AppResult<OrderView> {
        let order = self.owned(user, order_id).await?;
        let products = self.product_summaries(std::slice::from_ref(&order)).await?;
        Ok(OrderView::new(order, &products, OrderOwner::Id(user)))
    }

    /// Repairs checkouts left half-done:
    /// stale hosted orders are discarded, stale gateway orders are marked
    /// failed, and recent orders missing from their owner's history are
    /// linked. Cash orders stay pending until delivery. Orders already moved
    /// on by an admin or cancelled by the customer are never touched.
    pub async fn reconcile(&self, now: DateTime<Utc>, stale_after: Duration) -> AppResult<ReconcileReport> {
        let cutoff = now - stale_after;
        let mut report = ReconcileReport::default();

        for mut order in self.orders.list_pending_before(cutoff).await? {
            if !order.is_awaiting_payment() { continue; }
            match order.payment_method {
                PaymentMethod::Stripe => {
                    if order.discard("checkout session abandoned").is_err() { continue; }
                    if self.orders.delete_order(order.id, order.version).await? {
                        tracing::info!(order_id = %order.id, user_id = %order.user, "Stale hosted checkout order discarded");
                        self.events.publish_all(order.take_events()).await;
                        report.discarded += 1;
                    }
                }
                PaymentMethod::Razorpay => {
                    order.mark_payment_failed(now);
                    match self.orders.update_order(&mut order).await {
                        Ok(()) => {
                            tracing::info!(order_id = %order.id, user_id = %order.user, "Stale gateway order marked failed");
                            self.events.publish_all(order.take_events()).await;
                            report.failed += 1;
                        }
                        Err(StoreError::Conflict) => {
                            tracing::debug!(order_id = %order.id, "Order changed during sweep, skipped");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                PaymentMethod::CashOnDelivery => {}
            }
        }

        // A hosted order without a session is still mid-checkout.
        let recent: Vec<Order> = self.orders.list_created_after(cutoff).await?
            .into_iter()
            .filter(|o| !(o.payment_method == PaymentMethod::Stripe && o.stripe_session_id.is_none()))
            .collect();
        let owner_ids: Vec<Uuid> = recent.iter().map(|o| o.user).collect::<HashSet<_>>().into_iter().collect();
        let linked: HashMap<Uuid, HashSet<Uuid>> = self.accounts.find_accounts(&owner_ids).await?
            .into_iter()
            .map(|a| (a.id, a.orders.into_iter().collect()))
            .collect();
        for order in recent {
            let Some(refs) = linked.get(&order.user) else { continue };
            if refs.contains(&order.id) { continue; }
            if self.accounts.append_order_reference(order.user, order.id).await? {
                tracing::info!(order_id = %order.id, user_id = %order.user, "Order re-linked to account");
                report.relinked += 1;
            }
        }
        Ok(report)
    }

    async fn owned(&self, user: Uuid, order_id: Uuid) -> AppResult<Order> {
        self.orders.find_order_for_account(user, order_id).await?.ok_or(AppError::NotFound("Order"))
    }

    async fn link(&self, order: &Order) {
        match self.accounts.append_order_reference(order.user, order.id).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(order_id = %order.id, user_id = %order.user, "Order already linked or account missing"),
            Err(e) => tracing::error!(
                order_id = %order.id, user_id = %order.user, error = %e,
                "Order not linked to account, reconciliation will retry"
            ),
        }
    }

    async fn clear_cart(&self, user: Uuid) {
        if let Err(e) = self.accounts.save_cart(user, &Cart::new()).await {
            tracing::error!(user_id = %user, error = %e, "Failed to clear cart after payment");
        }
    }

    async fn product_summaries(&self, orders: &[Order]) -> AppResult<HashMap<Uuid, ProductSummary>> {
        let ids: Vec<Uuid> = orders.iter()
            .flat_map(|o| o.products.iter().map(|i| i.product))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        Ok(self.catalog.find_products(&ids).await?.into_iter().map(|p| (p.id, p.summary())).collect())
    }
}
