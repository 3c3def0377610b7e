//! Product catalog. Read-mostly; the admin write paths exist so catalog
//! prices can change underneath existing orders without touching them.

use crate::entities::product;
use crate::errors::ServiceError;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use std::sync::Arc;
use tracing::instrument;

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<product::Model>, ServiceError> {
        let products = product::Entity::find()
            .order_by_asc(product::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(products)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn create(&self, input: product::Model) -> Result<product::Model, ServiceError> {
        if input.id.is_empty() || input.name.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Product id and name are required".to_string(),
            ));
        }
        if input.price < 0 {
            return Err(ServiceError::InvalidInput(
                "Product price must not be negative".to_string(),
            ));
        }

        let created = product::ActiveModel {
            id: Set(input.id),
            name: Set(input.name),
            category: Set(input.category),
            price: Set(input.price),
            description: Set(input.description),
            image: Set(input.image),
        }
        .insert(&*self.db)
        .await?;
        Ok(created)
    }

    /// Changes a catalog price. Existing orders keep the price they were sold
    /// at; only future checkouts see the new value.
    #[instrument(skip(self))]
    pub async fn update_price(
        &self,
        id: &str,
        price: i64,
    ) -> Result<product::Model, ServiceError> {
        if price < 0 {
            return Err(ServiceError::InvalidInput(
                "Product price must not be negative".to_string(),
            ));
        }

        let existing = self.get(id).await?;
        let mut active: product::ActiveModel = existing.into();
        active.price = Set(price);
        let updated = active.update(&*self.db).await?;
        Ok(updated)
    }
}
