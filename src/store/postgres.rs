//! PostgreSQL store. Embedded collections (cart, order references, line
//! items, reviews) live in JSONB columns so each record stays one row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{AccountStore, CatalogStore, OrderStore, ProductFilter, StoreError, StoreResult};
use crate::domain::aggregates::{Account, Address, Cart, CartItem, LineItem, Order, Product, Review};
use crate::domain::value_objects::Email;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: Uuid, name: String, email: String, password_hash: Option<String>, google_id: Option<String>,
    role: String, cart: Json<Vec<CartItem>>, orders: Json<Vec<Uuid>>,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;
    fn try_from(r: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: r.id, name: r.name,
            email: Email::new(r.email).map_err(|e| StoreError::Corrupt(format!("account {}: {e}", r.id)))?,
            password_hash: r.password_hash, google_id: r.google_id,
            role: r.role.parse().map_err(|e| StoreError::Corrupt(format!("account {}: {e}", r.id)))?,
            cart: Cart::from(r.cart.0), orders: r.orders.0,
            created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid, name: String, description: String, price: Decimal, category: String, sub_category: String,
    sizes: Json<Vec<String>>, images: Json<Vec<String>>, bestseller: bool, is_featured: bool,
    reviews: Json<Vec<Review>>, average_rating: f64, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Product {
            id: r.id, name: r.name, description: r.description, price: r.price, category: r.category,
            sub_category: r.sub_category, sizes: r.sizes.0, images: r.images.0, bestseller: r.bestseller,
            is_featured: r.is_featured, reviews: r.reviews.0, average_rating: r.average_rating,
            created_at: r.created_at, updated_at: r.updated_at, events: vec![],
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid, user_id: Uuid, products: Json<Vec<LineItem>>, total_amount: Decimal, address: Json<Address>,
    status: String, payment_method: String, payment_status: String, delivered_at: Option<DateTime<Utc>>,
    is_returned: bool, is_cancelled: bool, stripe_session_id: Option<String>, razorpay_order_id: Option<String>,
    razorpay_payment_id: Option<String>, razorpay_signature: Option<String>, version: i64,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;
    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        let corrupt = |e: crate::domain::aggregates::OrderError| StoreError::Corrupt(format!("order {}: {e}", r.id));
        Ok(Order {
            id: r.id, user: r.user_id, products: r.products.0, total_amount: r.total_amount, address: r.address.0,
            status: r.status.parse().map_err(corrupt)?,
            payment_method: r.payment_method.parse().map_err(corrupt)?,
            payment_status: r.payment_status.parse().map_err(corrupt)?,
            delivered_at: r.delivered_at, is_returned: r.is_returned, is_cancelled: r.is_cancelled,
            stripe_session_id: r.stripe_session_id, razorpay_order_id: r.razorpay_order_id,
            razorpay_payment_id: r.razorpay_payment_id, razorpay_signature: r.razorpay_signature,
            version: r.version, created_at: r.created_at, updated_at: r.updated_at, events: vec![],
        })
    }
}

fn into_orders(rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
    rows.into_iter().map(Order::try_from).collect()
}

fn into_accounts(rows: Vec<AccountRow>) -> StoreResult<Vec<Account>> {
    rows.into_iter().map(Account::try_from).collect()
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[async_trait]
impl AccountStore for PgStore {
    async fn insert_account(&self, a: &Account) -> StoreResult<()> {
        let cart: Vec<CartItem> = a.cart.items().collect();
        sqlx::query("INSERT INTO accounts (id, name, email, password_hash, google_id, role, cart, orders, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)")
            .bind(a.id).bind(&a.name).bind(a.email.as_str()).bind(&a.password_hash).bind(&a.google_id)
            .bind(a.role.as_str()).bind(Json(cart)).bind(Json(&a.orders)).bind(a.created_at).bind(a.updated_at)
            .execute(&self.pool).await
            .map_err(|e| if is_unique_violation(&e) { StoreError::Duplicate("email") } else { e.into() })?;
        Ok(())
    }

    async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?.map(Account::try_from).transpose()
    }

    async fn find_account_by_email(&self, email: &Email) -> StoreResult<Option<Account>> {
        sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE email = $1")
            .bind(email.as_str()).fetch_optional(&self.pool).await?.map(Account::try_from).transpose()
    }

    async fn find_accounts(&self, ids: &[Uuid]) -> StoreResult<Vec<Account>> {
        into_accounts(sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = ANY($1)")
            .bind(ids).fetch_all(&self.pool).await?)
    }

    async fn list_accounts(&self) -> StoreResult<Vec<Account>> {
        into_accounts(sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts ORDER BY created_at")
            .fetch_all(&self.pool).await?)
    }

    async fn save_cart(&self, account_id: Uuid, cart: &Cart) -> StoreResult<bool> {
        let items: Vec<CartItem> = cart.items().collect();
        let r = sqlx::query("UPDATE accounts SET cart = $2, updated_at = NOW() WHERE id = $1")
            .bind(account_id).bind(Json(items)).execute(&self.pool).await?;
        Ok(r.rows_affected() > 0)
    }

    async fn append_order_reference(&self, account_id: Uuid, order_id: Uuid) -> StoreResult<bool> {
        let r = sqlx::query("UPDATE accounts SET orders = orders || jsonb_build_array($2::text), updated_at = NOW() WHERE id = $1 AND NOT (orders @> jsonb_build_array($2::text))")
            .bind(account_id).bind(order_id.to_string()).execute(&self.pool).await?;
        Ok(r.rows_affected() > 0)
    }

    async fn delete_account(&self, id: Uuid) -> StoreResult<bool> {
        let r = sqlx::query("DELETE FROM accounts WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(r.rows_affected() > 0)
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn insert_product(&self, p: &Product) -> StoreResult<()> {
        sqlx::query("INSERT INTO products (id, name, description, price, category, sub_category, sizes, images, bestseller, is_featured, reviews, average_rating, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)")
            .bind(p.id).bind(&p.name).bind(&p.description).bind(p.price).bind(&p.category).bind(&p.sub_category)
            .bind(Json(&p.sizes)).bind(Json(&p.images)).bind(p.bestseller).bind(p.is_featured)
            .bind(Json(&p.reviews)).bind(p.average_rating).bind(p.created_at).bind(p.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?.map(Product::from))
    }

    async fn find_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = ANY($1)")
            .bind(ids).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let rows = match filter {
            ProductFilter::All => sqlx::query_as::<_, ProductRow>("SELECT * FROM products ORDER BY created_at")
                .fetch_all(&self.pool).await?,
            ProductFilter::Bestsellers => sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE bestseller ORDER BY created_at")
                .fetch_all(&self.pool).await?,
            ProductFilter::Category(c) => sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE category = $1 ORDER BY created_at")
                .bind(c).fetch_all(&self.pool).await?,
        };
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn update_product(&self, p: &Product) -> StoreResult<bool> {
        let r = sqlx::query("UPDATE products SET name = $2, description = $3, price = $4, category = $5, sub_category = $6, sizes = $7, images = $8, bestseller = $9, is_featured = $10, reviews = $11, average_rating = $12, updated_at = $13 WHERE id = $1")
            .bind(p.id).bind(&p.name).bind(&p.description).bind(p.price).bind(&p.category).bind(&p.sub_category)
            .bind(Json(&p.sizes)).bind(Json(&p.images)).bind(p.bestseller).bind(p.is_featured)
            .bind(Json(&p.reviews)).bind(p.average_rating).bind(p.updated_at)
            .execute(&self.pool).await?;
        Ok(r.rows_affected() > 0)
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        let r = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(r.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, o: &Order) -> StoreResult<()> {
        sqlx::query("INSERT INTO orders (id, user_id, products, total_amount, address, status, payment_method, payment_status, delivered_at, is_returned, is_cancelled, stripe_session_id, razorpay_order_id, razorpay_payment_id, razorpay_signature, version, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)")
            .bind(o.id).bind(o.user).bind(Json(&o.products)).bind(o.total_amount).bind(Json(&o.address))
            .bind(o.status.as_str()).bind(o.payment_method.as_str()).bind(o.payment_status.as_str())
            .bind(o.delivered_at).bind(o.is_returned).bind(o.is_cancelled).bind(&o.stripe_session_id)
            .bind(&o.razorpay_order_id).bind(&o.razorpay_payment_id).bind(&o.razorpay_signature)
            .bind(o.version).bind(o.created_at).bind(o.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?.map(Order::try_from).transpose()
    }

    async fn find_order_for_account(&self, account_id: Uuid, order_id: Uuid) -> StoreResult<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
            .bind(order_id).bind(account_id).fetch_optional(&self.pool).await?.map(Order::try_from).transpose()
    }

    async fn list_orders_for_account(&self, account_id: Uuid) -> StoreResult<Vec<Order>> {
        into_orders(sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at")
            .bind(account_id).fetch_all(&self.pool).await?)
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        into_orders(sqlx::query_as::<_, OrderRow>("SELECT * FROM orders ORDER BY created_at")
            .fetch_all(&self.pool).await?)
    }

    async fn list_pending_before(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Order>> {
        into_orders(sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE payment_status = 'pending' AND status = 'pending' AND NOT is_cancelled AND created_at < $1 ORDER BY created_at")
            .bind(cutoff).fetch_all(&self.pool).await?)
    }

    async fn list_created_after(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<Order>> {
        into_orders(sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE created_at > $1 ORDER BY created_at")
            .bind(cutoff).fetch_all(&self.pool).await?)
    }

    async fn update_order(&self, o: &mut Order) -> StoreResult<()> {
        let r = sqlx::query("UPDATE orders SET products = $3, total_amount = $4, address = $5, status = $6, payment_method = $7, payment_status = $8, delivered_at = $9, is_returned = $10, is_cancelled = $11, stripe_session_id = $12, razorpay_order_id = $13, razorpay_payment_id = $14, razorpay_signature = $15, updated_at = $16, version = version + 1 WHERE id = $1 AND version = $2")
            .bind(o.id).bind(o.version).bind(Json(&o.products)).bind(o.total_amount).bind(Json(&o.address))
            .bind(o.status.as_str()).bind(o.payment_method.as_str()).bind(o.payment_status.as_str())
            .bind(o.delivered_at).bind(o.is_returned).bind(o.is_cancelled).bind(&o.stripe_session_id)
            .bind(&o.razorpay_order_id).bind(&o.razorpay_payment_id).bind(&o.razorpay_signature).bind(o.updated_at)
            .execute(&self.pool).await?;
        if r.rows_affected() == 0 { return Err(StoreError::Conflict); }
        o.version += 1;
        Ok(())
    }

    async fn delete_order(&self, id: Uuid, version: i64) -> StoreResult<bool> {
        let r = sqlx::query("DELETE FROM orders WHERE id = $1 AND version = $2")
            .bind(id).bind(version).execute(&self.pool).await?;
        Ok(r.rows_affected() > 0)
    }
}
