use std::sync::Arc;

use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::AppError,
    items::{
        dto::{ItemFields, Pagination},
        repo::ItemRepo,
        repo_types::ListItem,
    },
};

/// Owner-scoped CRUD over list items.
///
/// An item that does not exist and an item owned by someone else are both
/// reported as `NotFound`.
#[derive(Clone)]
pub struct ItemService {
    repo: Arc<dyn ItemRepo>,
}

impl ItemService {
    pub fn new(repo: Arc<dyn ItemRepo>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, owner_id: Uuid, page: &Pagination) -> Result<Vec<ListItem>, AppError> {
        let (limit, offset) = page.clamped();
        Ok(self.repo.list_by_owner(owner_id, limit, offset).await?)
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> Result<ListItem, AppError> {
        match self.repo.get(id).await? {
            Some(item) if item.owner_id == owner_id => Ok(item),
            Some(_) => {
                debug!(%owner_id, item_id = %id, "item belongs to another account");
                Err(AppError::NotFound("Item"))
            }
            None => Err(AppError::NotFound("Item")),
        }
    }

    pub async fn add(&self, owner_id: Uuid, fields: ItemFields) -> Result<ListItem, AppError> {
        let item = ListItem {
            id: Uuid::new_v4(),
            owner_id,
            name: fields.name,
            quantity: fields.quantity,
            category: fields.category,
            created_at: OffsetDateTime::now_utc(),
        };
        self.repo.insert(&item).await?;
        Ok(item)
    }

    pub async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        fields: ItemFields,
    ) -> Result<ListItem, AppError> {
        let mut item = self.get(owner_id, id).await?;
        item.name = fields.name;
        item.quantity = fields.quantity;
        item.category = fields.category;
        self.repo.update(&item).await?;
        Ok(item)
    }

    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let item = self.get(owner_id, id).await?;
        if !self.repo.delete(item.id).await? {
            return Err(AppError::NotFound("Item"));
        }
        Ok(())
    }
}
