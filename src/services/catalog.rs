use std::sync::Arc;
use uuid::Uuid;

use super::EventPublisher;
use crate::domain::aggregates::{Account, Product, ProductDraft, ProductUpdate};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::Rating;
use crate::error::{AppError, AppResult};
use crate::store::{CatalogStore, ProductFilter};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    events: EventPublisher,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>, events: EventPublisher) -> Self { Self { store, events } }

    pub async fn create(&self, draft: ProductDraft) -> AppResult<Product> {
        let mut product = Product::create(draft)?;
        self.store.insert_product(&product).await?;
        tracing::info!(product_id = %product.id, "Product created");
        self.events.publish_all(product.take_events()).await;
        Ok(product)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Product> {
        self.store.find_product(id).await?.ok_or(AppError::NotFound("Product"))
    }

    pub async fn list(&self, filter: ProductFilter) -> AppResult<Vec<Product>> {
        Ok(self.store.list_products(&filter).await?)
    }

    pub async fn update(&self, id: Uuid, update: ProductUpdate) -> AppResult<Product> {
        let mut product = self.get(id).await?;
        product.apply(update)?;
        if !self.store.update_product(&product).await? {
            return Err(AppError::NotFound("Product"));
        }
        Ok(product)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.store.delete_product(id).await? {
            return Err(AppError::NotFound("Product"));
        }
        tracing::info!(product_id = %id, "Product deleted");
        self.events.publish_all(vec![DomainEvent::Product(ProductEvent::Deleted { product_id: id })]).await;
        Ok(())
    }

    pub async fn toggle_featured(&self, id: Uuid) -> AppResult<Product> {
        let mut product = self.get(id).await?;
        product.toggle_featured();
        if !self.store.update_product(&product).await? {
            return Err(AppError::NotFound("Product"));
        }
        Ok(product)
    }

    pub async fn add_review(&self, id: Uuid, reviewer: &Account, rating: Rating, comment: Option<String>) -> AppResult<Product> {
        let mut product = self.get(id).await?;
        product.add_review(reviewer.id, reviewer.name.clone(), rating, comment)?;
        if !self.store.update_product(&product).await? {
            return Err(AppError::NotFound("Product"));
        }
        self.events.publish_all(product.take_events()).await;
        Ok(product)
    }
}
