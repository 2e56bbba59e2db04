//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::Rating;

pub const MAX_IMAGES: usize = 4;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub user: Uuid,
    pub name: String,
    pub rating: Rating,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub sub_category: String,
    pub sizes: Vec<String>,
    #[serde(rename = "image")]
    pub images: Vec<String>,
    pub bestseller: bool,
    pub is_featured: bool,
    pub reviews: Vec<Review>,
    pub average_rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<DomainEvent>,
}

/// Fields accepted when creating a product.
#[derive(Clone, Debug, Default)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category: String,
    pub sub_category: String,
    pub sizes: Vec<String>,
    pub images: Vec<String>,
    pub bestseller: bool,
}

/// Partial update; `None` keeps the current value.
#[derive(Clone, Debug, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub sizes: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub bestseller: Option<bool>,
}

/// Display fields resolved into orders and carts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub image: Vec<String>,
    pub price: Decimal,
}

impl Product {
    pub fn create(draft: ProductDraft) -> Result<Self, ProductError> {
        let name = draft.name.trim().to_string();
        if name.is_empty() { return Err(ProductError::MissingName); }
        check_price(draft.price)?;
        check_images(&draft.images)?;
        let now = Utc::now();
        let id = Uuid::now_v7();
        let mut product = Self {
            id, name, description: draft.description, price: draft.price,
            category: draft.category, sub_category: draft.sub_category,
            sizes: draft.sizes, images: draft.images, bestseller: draft.bestseller,
            is_featured: false, reviews: vec![], average_rating: 0.0,
            created_at: now, updated_at: now, events: vec![],
        };
        product.raise_event(DomainEvent::Product(ProductEvent::Created { product_id: id }));
        Ok(product)
    }

    pub fn apply(&mut self, update: ProductUpdate) -> Result<(), ProductError> {
        if let Some(price) = update.price { check_price(price)?; }
        if let Some(images) = &update.images { check_images(images)?; }
        if let Some(name) = update.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) { self.name = name; }
        if let Some(description) = update.description.filter(|d| !d.is_empty()) { self.description = description; }
        if let Some(price) = update.price { self.price = price; }
        if let Some(category) = update.category.filter(|c| !c.is_empty()) { self.category = category; }
        if let Some(sub_category) = update.sub_category.filter(|c| !c.is_empty()) { self.sub_category = sub_category; }
        if let Some(sizes) = update.sizes.filter(|s| !s.is_empty()) { self.sizes = sizes; }
        if let Some(images) = update.images { self.images = images; }
        if let Some(bestseller) = update.bestseller { self.bestseller = bestseller; }
        self.touch();
        Ok(())
    }

    pub fn toggle_featured(&mut self) -> bool {
        self.is_featured = !self.is_featured;
        self.touch();
        self.is_featured
    }

    /// One review per reviewer; the average is recomputed from every rating.
    pub fn add_review(&mut self, user: Uuid, name: impl Into<String>, rating: Rating, comment: Option<String>) -> Result<(), ProductError> {
        if self.reviews.iter().any(|r| r.user == user) { return Err(ProductError::AlreadyReviewed); }
        self.reviews.push(Review { user, name: name.into(), rating, comment, created_at: Utc::now() });
        self.recalculate_rating();
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::ReviewAdded {
            product_id: self.id, reviewer: user, rating: rating.value(), average_rating: self.average_rating,
        }));
        Ok(())
    }

    pub fn summary(&self) -> ProductSummary {
        ProductSummary { id: self.id, name: self.name.clone(), image: self.images.clone(), price: self.price }
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn recalculate_rating(&mut self) {
        let total: u32 = self.reviews.iter().map(|r| u32::from(r.rating.value())).sum();
        self.average_rating = if self.reviews.is_empty() { 0.0 } else { f64::from(total) / self.reviews.len() as f64 };
    }

    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn check_price(price: Decimal) -> Result<(), ProductError> {
    if price.is_sign_negative() { Err(ProductError::NegativePrice) } else { Ok(()) }
}

fn check_images(images: &[String]) -> Result<(), ProductError> {
    if images.len() > MAX_IMAGES { Err(ProductError::TooManyImages(images.len())) } else { Ok(()) }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProductError {
    #[error("Name and price are required")]
    MissingName,
    #[error("Price must not be negative")]
    NegativePrice,
    #[error("At most 4 images are allowed, got {0}")]
    TooManyImages(usize),
    #[error("You already reviewed this product")]
    AlreadyReviewed,
}
