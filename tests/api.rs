//! End-to-end flows through the HTTP router, backed by the in-memory store
//! and fake payment providers.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{json, Value};
use sha2::Sha256;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use storefront_backend::api;
use storefront_backend::auth::{hash_password, AuthError, GoogleProfile, IdentityProvider, TokenIssuer};
use storefront_backend::domain::aggregates::{
    Account, Address, LineItem, NewOrder, Order, OrderStatus, PaymentMethod, PaymentStatus, Product, ProductDraft, Role,
};
use storefront_backend::domain::value_objects::Email;
use storefront_backend::payments::{
    verify_payment_signature, CheckoutLine, CheckoutSession, GatewayOrder, HostedCheckout, PaymentError, SignedOrderGateway,
};
use storefront_backend::services::{
    AccountService, CartService, CatalogService, EventPublisher, OrderService, OrderSettings,
};
use storefront_backend::state::AppState;
use storefront_backend::store::{AccountStore, CatalogStore, MemoryStore, OrderStore};

const GATEWAY_SECRET: &str = "rzp_test_secret";
const GATEWAY_ORDER_ID: &str = "order_test_001";
const PASSWORD: &str = "hunter22";

#[derive(Default)]
struct FakeCheckout {
    fail: AtomicBool,
    sessions: Mutex<Vec<Vec<CheckoutLine>>>,
}

#[async_trait]
impl HostedCheckout for FakeCheckout {
    async fn create_session(
        &self,
        lines: &[CheckoutLine],
        _currency: &str,
        _success_url: &str,
        _cancel_url: &str,
    ) -> Result<CheckoutSession, PaymentError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PaymentError::Rejected("card network down".to_string()));
        }
        let mut sessions = self.sessions.lock().unwrap();
        sessions.push(lines.to_vec());
        Ok(CheckoutSession { id: format!("cs_test_{}", sessions.len()), url: Some("https://checkout.test/pay".to_string()) })
    }
}

struct FakeGateway;

#[async_trait]
impl SignedOrderGateway for FakeGateway {
    async fn create_order(&self, amount_minor: i64, currency: &str, _receipt: &str) -> Result<GatewayOrder, PaymentError> {
        Ok(GatewayOrder { id: GATEWAY_ORDER_ID.to_string(), amount: amount_minor, currency: currency.to_string() })
    }

    fn verify_signature(&self, provider_order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_payment_signature(GATEWAY_SECRET, provider_order_id, payment_id, signature)
    }
}

struct FakeIdentity;

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn profile(&self, access_token: &str) -> Result<GoogleProfile, AuthError> {
        match access_token {
            "good-token" => Ok(GoogleProfile {
                email: Some("federated@example.com".to_string()),
                name: Some("Fed User".to_string()),
                sub: Some("google-sub-1".to_string()),
            }),
            "no-email" => Ok(GoogleProfile { sub: Some("google-sub-2".to_string()), ..Default::default() }),
            _ => Err(AuthError::FederatedRejected),
        }
    }
}

struct Harness {
    app: Router,
    state: AppState,
    store: MemoryStore,
    checkout: Arc<FakeCheckout>,
}

impl Harness {
    fn new() -> Self {
        let store = MemoryStore::new();
        let shared = Arc::new(store.clone());
        let checkout = Arc::new(FakeCheckout::default());
        let events = EventPublisher::default();
        let orders = OrderService::new(
            shared.clone(),
            shared.clone(),
            shared.clone(),
            checkout.clone(),
            Arc::new(FakeGateway),
            events.clone(),
            OrderSettings {
                client_url: "http://localhost:5173".to_string(),
                delivery_charge: Decimal::TEN,
                currency: "inr".to_string(),
            },
        );
        let state = AppState {
            accounts: AccountService::new(shared.clone(), Arc::new(FakeIdentity)),
            catalog: CatalogService::new(shared.clone(), events),
            carts: CartService::new(shared.clone(), shared.clone()),
            orders,
            tokens: TokenIssuer::new(SecretString::from("integration-test-secret")),
            secure_cookies: false,
        };
        Self { app: api::router(state.clone()), state, store, checkout }
    }

    async fn account(&self, email: &str, role: Role) -> (Account, String) {
        let mut account = Account::register("Test User", Email::new(email).unwrap(), hash_password(PASSWORD).unwrap());
        account.role = role;
        self.store.insert_account(&account).await.unwrap();
        let token = self.state.tokens.issue(account.id).unwrap();
        (account, token)
    }

    async fn product(&self, name: &str, price: Decimal) -> Product {
        let product = Product::create(ProductDraft {
            name: name.to_string(),
            description: "Cotton".to_string(),
            price,
            category: "Men".to_string(),
            sub_category: "Topwear".to_string(),
            sizes: vec!["M".to_string(), "L".to_string()],
            images: vec![],
            bestseller: false,
        }).unwrap();
        self.store.insert_product(&product).await.unwrap();
        product
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let (status, _, json) = self.call_raw(method, uri, token, body).await;
        (status, json)
    }

    async fn call_raw(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Option<String>, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::COOKIE, format!("accessToken={token}"));
        }
        let req = match body {
            Some(body) => req.header(header::CONTENT_TYPE, "application/json").body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }.unwrap();
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let cookie = resp.headers().get(header::SET_COOKIE).map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, cookie, json)
    }
}

fn address() -> Value {
    json!({ "street": "12 MG Road", "city": "Pune", "zipCode": "411001", "state": "MH", "country": "IN" })
}

fn sign(order_id: &str, payment_id: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(GATEWAY_SECRET.as_bytes()).unwrap();
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

async fn stored_order(h: &Harness, id: &str) -> Option<Order> {
    h.store.find_order(id.parse().unwrap()).await.unwrap()
}

#[tokio::test]
async fn test_health() {
    let h = Harness::new();
    let (status, body) = h.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_signup_sets_session_cookie_and_profile_reads_it() {
    let h = Harness::new();
    let (status, cookie, body) = h.call_raw(
        Method::POST, "/api/auth/signup", None,
        Some(json!({ "name": "Asha", "email": "asha@example.com", "password": PASSWORD })),
    ).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "asha@example.com");
    assert!(body["user"].get("passwordHash").is_none());

    let cookie = cookie.expect("session cookie");
    assert!(cookie.starts_with("accessToken="));
    assert!(cookie.contains("HttpOnly"));
    let token = cookie.trim_start_matches("accessToken=").split(';').next().unwrap().to_string();

    let (status, body) = h.call(Method::GET, "/api/auth/profile", Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Asha");
}

#[tokio::test]
async fn test_signup_rejects_taken_email_and_short_password() {
    let h = Harness::new();
    h.account("taken@example.com", Role::Customer).await;

    let (status, body) = h.call(
        Method::POST, "/api/auth/signup", None,
        Some(json!({ "name": "B", "email": "taken@example.com", "password": PASSWORD })),
    ).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, _) = h.call(
        Method::POST, "/api/auth/signup", None,
        Some(json!({ "name": "C", "email": "short@example.com", "password": "abc" })),
    ).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_and_admin_login() {
    let h = Harness::new();
    h.account("shopper@example.com", Role::Customer).await;
    h.account("boss@example.com", Role::Admin).await;

    let (status, _) = h.call(Method::POST, "/api/auth/login", None,
        Some(json!({ "email": "shopper@example.com", "password": "wrong-pass" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, cookie, _) = h.call_raw(Method::POST, "/api/auth/login", None,
        Some(json!({ "email": "shopper@example.com", "password": PASSWORD }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(cookie.is_some());

    let (status, _) = h.call(Method::POST, "/api/auth/adlogin", None,
        Some(json!({ "email": "shopper@example.com", "password": PASSWORD }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = h.call(Method::POST, "/api/auth/adlogin", None,
        Some(json!({ "email": "boss@example.com", "password": PASSWORD }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_google_sign_in_creates_then_reuses_account() {
    let h = Harness::new();
    let (status, first) = h.call(Method::POST, "/api/auth/google-signup", None, Some(json!({ "token": "good-token" }))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = h.call(Method::POST, "/api/auth/google-signup", None, Some(json!({ "token": "good-token" }))).await;
    assert_eq!(first["user"]["id"], second["user"]["id"]);
    assert_eq!(h.store.list_accounts().await.unwrap().len(), 1);

    let (status, _) = h.call(Method::POST, "/api/auth/google-signup", None, Some(json!({ "token": "no-email" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = h.call(Method::POST, "/api/auth/google-signup", None, Some(json!({ "token": "bogus" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let h = Harness::new();
    let (status, body) = h.call(Method::GET, "/api/products/all", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = h.call(Method::GET, "/api/products/all", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = h.call(Method::GET, "/api/products/bestseller", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_only_endpoints_refuse_customers() {
    let h = Harness::new();
    let (_, token) = h.account("shopper@example.com", Role::Customer).await;

    for (method, uri, body) in [
        (Method::GET, "/api/orders/list", None),
        (Method::GET, "/api/analytics/getusers", None),
        (Method::POST, "/api/products/create", Some(json!({ "name": "Tee", "price": 10 }))),
    ] {
        let (status, _) = h.call(method, uri, Some(token.as_str()), body).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
    }
}

#[tokio::test]
async fn test_admin_manages_catalog_and_users() {
    let h = Harness::new();
    let (_, admin) = h.account("boss@example.com", Role::Admin).await;
    let (customer, _) = h.account("shopper@example.com", Role::Customer).await;

    let (status, body) = h.call(Method::POST, "/api/products/create", Some(admin.as_str()), Some(json!({
        "name": "Linen Shirt", "description": "Breathable", "price": 49.5,
        "category": "Men", "subCategory": "Topwear", "sizes": ["M"], "bestseller": true, "image": ["a.png"],
    }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["product"]["id"].as_str().unwrap().to_string();

    let (_, body) = h.call(Method::GET, "/api/products/bestseller", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = h.call(Method::PATCH, &format!("/api/products/featured/{id}"), Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isFeatured"], true);

    let (status, _) = h.call(Method::POST, "/api/products/create", Some(admin.as_str()),
        Some(json!({ "name": "Too many", "price": 5, "image": ["1", "2", "3", "4", "5"] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h.call(Method::DELETE, &format!("/api/products/remove/{id}"), Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h.call(Method::POST, "/api/products/getsingle", Some(admin.as_str()), Some(json!({ "productId": id }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, users) = h.call(Method::GET, "/api/analytics/getusers", Some(admin.as_str()), None).await;
    assert_eq!(users.as_array().unwrap().len(), 2);
    let (status, _) = h.call(Method::DELETE, &format!("/api/analytics/dltuser/{}", customer.id), Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h.call(Method::DELETE, &format!("/api/analytics/dltuser/{}", customer.id), Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reviews_average_and_one_per_user() {
    let h = Harness::new();
    let product = h.product("Chinos", Decimal::new(30, 0)).await;
    let (_, first) = h.account("one@example.com", Role::Customer).await;
    let (_, second) = h.account("two@example.com", Role::Customer).await;
    let uri = format!("/api/products/{}/reviews", product.id);

    let (status, _) = h.call(Method::POST, &uri, Some(first.as_str()), Some(json!({ "rating": 5, "comment": "Great" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = h.call(Method::POST, &uri, Some(second.as_str()), Some(json!({ "rating": 2 }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["product"]["reviews"].as_array().unwrap().len(), 2);
    assert_eq!(body["product"]["averageRating"].as_f64(), Some(3.5));

    let (status, _) = h.call(Method::POST, &uri, Some(first.as_str()), Some(json!({ "rating": 4 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = h.call(Method::POST, &uri, Some(second.as_str()), Some(json!({ "rating": 6 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cart_flow() {
    let h = Harness::new();
    let product = h.product("Hoodie", Decimal::new(60, 0)).await;
    let (_, token) = h.account("shopper@example.com", Role::Customer).await;
    let add = json!({ "productId": product.id, "size": "M" });

    h.call(Method::POST, "/api/cart/add", Some(token.as_str()), Some(add.clone())).await;
    let (status, body) = h.call(Method::POST, "/api/cart/add", Some(token.as_str()), Some(add.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cartItems"][0]["quantity"], 2);

    let (status, _) = h.call(Method::POST, "/api/cart/add", Some(token.as_str()),
        Some(json!({ "productId": Uuid::new_v4(), "size": "M" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, lines) = h.call(Method::GET, "/api/cart", Some(token.as_str()), None).await;
    assert_eq!(lines[0]["name"], "Hoodie");

    let (_, body) = h.call(Method::PUT, &format!("/api/cart/{}", product.id), Some(token.as_str()),
        Some(json!({ "size": "M", "quantity": 5 }))).await;
    assert_eq!(body["cartItems"][0]["quantity"], 5);

    let (status, _) = h.call(Method::PUT, &format!("/api/cart/{}", product.id), Some(token.as_str()),
        Some(json!({ "size": "XL", "quantity": 1 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = h.call(Method::POST, "/api/cart/removeone", Some(token.as_str()), Some(add)).await;
    assert!(body["cartItems"].as_array().unwrap().is_empty());

    h.call(Method::POST, "/api/cart/add", Some(token.as_str()), Some(json!({ "productId": product.id }))).await;
    let (_, body) = h.call(Method::DELETE, "/api/cart/clear", Some(token.as_str()), None).await;
    assert!(body["cartItems"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_cash_order_keeps_client_total_and_links_account() {
    let h = Harness::new();
    let product = h.product("Tee", Decimal::new(40, 0)).await;
    let (account, token) = h.account("shopper@example.com", Role::Customer).await;

    let (status, body) = h.call(Method::POST, "/api/orders/cod", Some(token.as_str()), Some(json!({
        "products": [{ "product": product.id, "size": "M", "quantity": 2, "price": 40 }],
        "totalAmount": 100,
        "address": address(),
        "paymentMethod": "cash_on_delivery",
    }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["order"]["totalAmount"].as_f64(), Some(100.0));
    assert_eq!(body["order"]["status"], "pending");
    assert_eq!(body["order"]["paymentStatus"], "pending");

    let refs = h.store.find_account(account.id).await.unwrap().unwrap().orders;
    assert_eq!(refs.len(), 1);
    assert_eq!(refs[0].to_string(), body["order"]["id"].as_str().unwrap());

    let (status, listed) = h.call(Method::GET, &format!("/api/orders/user/{}", account.id), Some(token.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["orders"][0]["products"][0]["product"]["name"], "Tee");
}

#[tokio::test]
async fn test_cash_checkout_rejects_other_methods_and_bad_input() {
    let h = Harness::new();
    let (_, token) = h.account("shopper@example.com", Role::Customer).await;
    let line = json!([{ "product": Uuid::new_v4(), "quantity": 1, "price": 10 }]);

    let (status, _) = h.call(Method::POST, "/api/orders/cod", Some(token.as_str()), Some(json!({
        "products": line, "totalAmount": 10, "address": address(), "paymentMethod": "stripe",
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h.call(Method::POST, "/api/orders/cod", Some(token.as_str()), Some(json!({
        "products": [], "totalAmount": 10, "address": address(), "paymentMethod": "cash_on_delivery",
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h.call(Method::POST, "/api/orders/cod", Some(token.as_str()), Some(json!({
        "products": line, "totalAmount": 10, "address": {}, "paymentMethod": "cash_on_delivery",
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.store.list_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_hosted_checkout_prices_from_catalog() {
    let h = Harness::new();
    let product = h.product("Jacket", Decimal::new(4550, 2)).await;
    let (account, token) = h.account("shopper@example.com", Role::Customer).await;

    let (status, body) = h.call(Method::POST, "/api/orders/stripe", Some(token.as_str()), Some(json!({
        "products": [{ "product": product.id, "size": "L", "quantity": 2 }],
        "address": address(),
    }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["sessionId"], "cs_test_1");
    assert_eq!(body["order"]["totalAmount"].as_f64(), Some(101.0));

    let lines = h.checkout.sessions.lock().unwrap()[0].clone();
    assert_eq!(lines.len(), 2);
    assert_eq!((lines[0].unit_amount, lines[0].quantity), (4550, 2));
    assert_eq!(lines[1].name, "Delivery Charge");
    assert_eq!(lines[1].unit_amount, 1000);

    let stored = stored_order(&h, body["order"]["id"].as_str().unwrap()).await.unwrap();
    assert_eq!(stored.stripe_session_id.as_deref(), Some("cs_test_1"));
    assert_eq!(h.store.find_account(account.id).await.unwrap().unwrap().orders, vec![stored.id]);
}

#[tokio::test]
async fn test_hosted_checkout_failure_removes_order() {
    let h = Harness::new();
    let product = h.product("Jacket", Decimal::new(45, 0)).await;
    let (_, token) = h.account("shopper@example.com", Role::Customer).await;
    h.checkout.fail.store(true, Ordering::SeqCst);

    let (status, body) = h.call(Method::POST, "/api/orders/stripe", Some(token.as_str()), Some(json!({
        "products": [{ "product": product.id, "quantity": 1 }],
        "address": address(),
    }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(h.store.list_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_verify_hosted_paid_clears_cart_and_failure_deletes() {
    let h = Harness::new();
    let product = h.product("Jacket", Decimal::new(45, 0)).await;
    let (account, token) = h.account("shopper@example.com", Role::Customer).await;
    let place = json!({ "products": [{ "product": product.id, "quantity": 1 }], "address": address() });

    h.call(Method::POST, "/api/cart/add", Some(token.as_str()), Some(json!({ "productId": product.id }))).await;
    let (_, paid) = h.call(Method::POST, "/api/orders/stripe", Some(token.as_str()), Some(place.clone())).await;
    let paid_id = paid["order"]["id"].as_str().unwrap().to_string();
    let (status, body) = h.call(Method::POST, "/api/orders/verifyStripe", Some(token.as_str()),
        Some(json!({ "orderId": paid_id, "success": "true" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(stored_order(&h, &paid_id).await.unwrap().payment_status, PaymentStatus::Paid);
    assert!(h.store.find_account(account.id).await.unwrap().unwrap().cart.is_empty());

    // A paid order is never deleted by a late failure callback.
    let (status, _) = h.call(Method::POST, "/api/orders/verifyStripe", Some(token.as_str()),
        Some(json!({ "orderId": paid_id, "success": false }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(stored_order(&h, &paid_id).await.is_some());

    let (_, abandoned) = h.call(Method::POST, "/api/orders/stripe", Some(token.as_str()), Some(place)).await;
    let abandoned_id = abandoned["order"]["id"].as_str().unwrap().to_string();
    let (status, body) = h.call(Method::POST, "/api/orders/verifyStripe", Some(token.as_str()),
        Some(json!({ "orderId": abandoned_id, "success": "false" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(stored_order(&h, &abandoned_id).await.is_none());
}

#[tokio::test]
async fn test_verify_hosted_rejects_other_users_order() {
    let h = Harness::new();
    let product = h.product("Jacket", Decimal::new(45, 0)).await;
    let (_, owner) = h.account("owner@example.com", Role::Customer).await;
    let (_, other) = h.account("other@example.com", Role::Customer).await;

    let (_, placed) = h.call(Method::POST, "/api/orders/stripe", Some(owner.as_str()),
        Some(json!({ "products": [{ "product": product.id, "quantity": 1 }], "address": address() }))).await;
    let (status, _) = h.call(Method::POST, "/api/orders/verifyStripe", Some(other.as_str()),
        Some(json!({ "orderId": placed["order"]["id"], "success": true }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_gateway_checkout_and_signature_verification() {
    let h = Harness::new();
    let product = h.product("Saree", Decimal::new(125, 0)).await;
    let (_, token) = h.account("shopper@example.com", Role::Customer).await;
    let place = json!({
        "products": [{ "product": product.id, "quantity": 2, "price": 125 }],
        "totalAmount": 250,
        "address": address(),
    });

    let (status, body) = h.call(Method::POST, "/api/orders/razorpay", Some(token.as_str()), Some(place.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["orderId"], GATEWAY_ORDER_ID);
    assert_eq!(body["amount"], 25000);
    assert_eq!(body["currency"], "INR");
    let order_id = body["order"]["id"].as_str().unwrap().to_string();

    let (status, body) = h.call(Method::POST, "/api/orders/verifyRazorpay", Some(token.as_str()), Some(json!({
        "orderId": order_id,
        "razorpay_order_id": GATEWAY_ORDER_ID,
        "razorpay_payment_id": "pay_001",
        "razorpay_signature": sign(GATEWAY_ORDER_ID, "pay_001"),
    }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let stored = stored_order(&h, &order_id).await.unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    assert_eq!(stored.razorpay_payment_id.as_deref(), Some("pay_001"));

    let (_, second) = h.call(Method::POST, "/api/orders/razorpay", Some(token.as_str()), Some(place)).await;
    let second_id = second["order"]["id"].as_str().unwrap().to_string();
    let (status, body) = h.call(Method::POST, "/api/orders/verifyRazorpay", Some(token.as_str()), Some(json!({
        "orderId": second_id,
        "razorpay_order_id": GATEWAY_ORDER_ID,
        "razorpay_payment_id": "pay_002",
        "razorpay_signature": sign(GATEWAY_ORDER_ID, "pay_999"),
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Payment verification failed");
    assert_eq!(stored_order(&h, &second_id).await.unwrap().payment_status, PaymentStatus::Failed);
}

#[tokio::test]
async fn test_unchargeable_totals_are_rejected_before_any_provider_call() {
    let h = Harness::new();
    let product = h.product("Saree", Decimal::new(125, 0)).await;
    let (_, token) = h.account("shopper@example.com", Role::Customer).await;

    for total in [json!(1e27), json!(1e20)] {
        let (status, body) = h.call(Method::POST, "/api/orders/razorpay", Some(token.as_str()), Some(json!({
            "products": [{ "product": product.id, "quantity": 1, "price": 125 }],
            "totalAmount": total,
            "address": address(),
        }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{total}");
        assert_eq!(body["success"], false);
    }

    let priceless = h.product("Crown", Decimal::MAX).await;
    let (status, _) = h.call(Method::POST, "/api/orders/stripe", Some(token.as_str()), Some(json!({
        "products": [{ "product": priceless.id, "quantity": 1 }],
        "address": address(),
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.checkout.sessions.lock().unwrap().is_empty());
    assert!(h.store.list_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_and_return_policies() {
    let h = Harness::new();
    let product = h.product("Tee", Decimal::new(40, 0)).await;
    let (_, admin) = h.account("boss@example.com", Role::Admin).await;
    let (_, token) = h.account("shopper@example.com", Role::Customer).await;
    let place = json!({
        "products": [{ "product": product.id, "quantity": 1, "price": 40 }],
        "totalAmount": 50, "address": address(), "paymentMethod": "cash_on_delivery",
    });

    let (_, first) = h.call(Method::POST, "/api/orders/cod", Some(token.as_str()), Some(place.clone())).await;
    let first_id = first["order"]["id"].clone();
    let (status, body) = h.call(Method::POST, "/api/orders/return", Some(token.as_str()), Some(json!({ "orderId": first_id }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Order not delivered yet");

    let (status, _) = h.call(Method::POST, "/api/orders/cancel", Some(token.as_str()), Some(json!({ "orderId": first_id }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h.call(Method::POST, "/api/orders/cancel", Some(token.as_str()), Some(json!({ "orderId": first_id }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, second) = h.call(Method::POST, "/api/orders/cod", Some(token.as_str()), Some(place)).await;
    let second_id = second["order"]["id"].clone();
    let (status, _) = h.call(Method::PUT, "/api/orders/status", Some(admin.as_str()),
        Some(json!({ "orderId": second_id, "status": "shipped" }))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = h.call(Method::POST, "/api/orders/cancel", Some(token.as_str()), Some(json!({ "orderId": second_id }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h.call(Method::PUT, "/api/orders/status", Some(admin.as_str()),
        Some(json!({ "orderId": second_id, "status": "teleported" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    h.call(Method::PUT, "/api/orders/status", Some(admin.as_str()), Some(json!({ "orderId": second_id, "status": "delivered" }))).await;
    let (status, body) = h.call(Method::POST, "/api/orders/return", Some(token.as_str()), Some(json!({ "orderId": second_id }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["status"], "returned");
    assert_eq!(body["order"]["isReturned"], true);
}

#[tokio::test]
async fn test_order_listing_access() {
    let h = Harness::new();
    let (admin_account, admin) = h.account("boss@example.com", Role::Admin).await;
    let (owner, token) = h.account("owner@example.com", Role::Customer).await;
    let (_, other) = h.account("other@example.com", Role::Customer).await;

    let (_, placed) = h.call(Method::POST, "/api/orders/cod", Some(token.as_str()), Some(json!({
        "products": [{ "product": Uuid::new_v4(), "quantity": 1, "price": 10 }],
        "totalAmount": 10, "address": address(), "paymentMethod": "cash_on_delivery",
    }))).await;
    let order_id = placed["order"]["id"].as_str().unwrap();

    let (status, _) = h.call(Method::GET, &format!("/api/orders/user/{}", owner.id), Some(other.as_str()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = h.call(Method::GET, &format!("/api/orders/user/{}", owner.id), Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h.call(Method::GET, "/api/orders/list", Some(admin.as_str()), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["user"]["email"], "owner@example.com");

    let (status, body) = h.call(Method::GET, &format!("/api/orders/{}/{}", owner.id, order_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"]["id"], order_id);
    let (status, _) = h.call(Method::GET, &format!("/api/orders/{}/{}", admin_account.id, order_id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reconcile_discards_fails_and_relinks() {
    let h = Harness::new();
    let product = h.product("Jacket", Decimal::new(45, 0)).await;
    let (account, token) = h.account("shopper@example.com", Role::Customer).await;

    let (_, hosted) = h.call(Method::POST, "/api/orders/stripe", Some(token.as_str()),
        Some(json!({ "products": [{ "product": product.id, "quantity": 1 }], "address": address() }))).await;
    let (_, gateway) = h.call(Method::POST, "/api/orders/razorpay", Some(token.as_str()), Some(json!({
        "products": [{ "product": product.id, "quantity": 1, "price": 45 }],
        "totalAmount": 45, "address": address(),
    }))).await;
    let (_, cash) = h.call(Method::POST, "/api/orders/cod", Some(token.as_str()), Some(json!({
        "products": [{ "product": product.id, "quantity": 1, "price": 45 }],
        "totalAmount": 45, "address": address(), "paymentMethod": "cash_on_delivery",
    }))).await;

    let later = Utc::now() + Duration::hours(3);
    let report = h.state.orders.reconcile(later, Duration::hours(2)).await.unwrap();
    assert_eq!((report.discarded, report.failed, report.relinked), (1, 1, 0));
    assert!(stored_order(&h, hosted["order"]["id"].as_str().unwrap()).await.is_none());
    let failed = stored_order(&h, gateway["order"]["id"].as_str().unwrap()).await.unwrap();
    assert_eq!(failed.payment_status, PaymentStatus::Failed);
    let kept = stored_order(&h, cash["order"]["id"].as_str().unwrap()).await.unwrap();
    assert_eq!(kept.status, OrderStatus::Pending);

    // An order stored without its account link gets re-linked.
    let orphan = Order::place(NewOrder {
        user: account.id,
        products: vec![LineItem { product: product.id, size: None, quantity: 1, price: Decimal::new(45, 0) }],
        total_amount: Decimal::new(45, 0),
        address: Address { street: "1 Main".into(), city: "Pune".into(), zip_code: "411001".into(), state: "MH".into(), country: "IN".into() },
        payment_method: PaymentMethod::CashOnDelivery,
    }, Utc::now()).unwrap();
    h.store.insert_order(&orphan).await.unwrap();

    let report = h.state.orders.reconcile(Utc::now(), Duration::hours(2)).await.unwrap();
    assert_eq!(report.relinked, 1);
    assert!(h.store.find_account(account.id).await.unwrap().unwrap().orders.contains(&orphan.id));

    let report = h.state.orders.reconcile(Utc::now(), Duration::hours(2)).await.unwrap();
    assert_eq!(report, Default::default());
}

#[tokio::test]
async fn test_reconcile_spares_orders_moved_on_by_admin_or_customer() {
    let h = Harness::new();
    let product = h.product("Jacket", Decimal::new(45, 0)).await;
    let (_, admin) = h.account("boss@example.com", Role::Admin).await;
    let (_, token) = h.account("shopper@example.com", Role::Customer).await;
    let hosted = json!({ "products": [{ "product": product.id, "quantity": 1 }], "address": address() });

    let (_, shipped) = h.call(Method::POST, "/api/orders/stripe", Some(token.as_str()), Some(hosted.clone())).await;
    let shipped_id = shipped["order"]["id"].as_str().unwrap().to_string();
    let (status, _) = h.call(Method::PUT, "/api/orders/status", Some(admin.as_str()),
        Some(json!({ "orderId": shipped_id, "status": "shipped" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, cancelled) = h.call(Method::POST, "/api/orders/stripe", Some(token.as_str()), Some(hosted)).await;
    let cancelled_id = cancelled["order"]["id"].as_str().unwrap().to_string();
    let (status, _) = h.call(Method::POST, "/api/orders/cancel", Some(token.as_str()), Some(json!({ "orderId": cancelled_id }))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, gateway) = h.call(Method::POST, "/api/orders/razorpay", Some(token.as_str()), Some(json!({
        "products": [{ "product": product.id, "quantity": 1, "price": 45 }],
        "totalAmount": 45, "address": address(),
    }))).await;
    let gateway_id = gateway["order"]["id"].as_str().unwrap().to_string();
    h.call(Method::PUT, "/api/orders/status", Some(admin.as_str()),
        Some(json!({ "orderId": gateway_id, "status": "processing" }))).await;

    let report = h.state.orders.reconcile(Utc::now() + Duration::hours(3), Duration::hours(2)).await.unwrap();
    assert_eq!((report.discarded, report.failed), (0, 0));

    let kept = stored_order(&h, &shipped_id).await.unwrap();
    assert_eq!(kept.status, OrderStatus::Shipped);
    assert!(stored_order(&h, &cancelled_id).await.unwrap().is_cancelled);
    let kept = stored_order(&h, &gateway_id).await.unwrap();
    assert_eq!((kept.status, kept.payment_status), (OrderStatus::Processing, PaymentStatus::Pending));
}
