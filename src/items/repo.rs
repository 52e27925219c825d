use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::items::repo_types::ListItem;

/// Item persistence. A `None` limit lists everything past `offset`. Lookups are by id only; owner checks happen in
/// [`crate::items::services::ItemService`].
#[async_trait]
pub trait ItemRepo: Send + Sync {
    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        limit: Option<i64>,
        offset: i64,
    ) -> anyhow::Result<Vec<ListItem>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<ListItem>>;
    async fn insert(&self, item: &ListItem) -> anyhow::Result<()>;
    async fn update(&self, item: &ListItem) -> anyhow::Result<()>;
    /// Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgItemRepo {
    db: PgPool,
}

impl PgItemRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ItemRepo for PgItemRepo {
    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        limit: Option<i64>,
        offset: i64,
    ) -> anyhow::Result<Vec<ListItem>> {
        let rows = sqlx::query_as::<_, ListItem>(
            r#"
            SELECT id, owner_id, name, quantity, category, created_at
            FROM list_items
            WHERE owner_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await
        .context("list items by owner")?;
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<ListItem>> {
        let row = sqlx::query_as::<_, ListItem>(
            r#"
            SELECT id, owner_id, name, quantity, category, created_at
            FROM list_items
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("get item")?;
        Ok(row)
    }

    async fn insert(&self, item: &ListItem) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO list_items (id, owner_id, name, quantity, category, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(item.id)
        .bind(item.owner_id)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(&item.category)
        .bind(item.created_at)
        .execute(&self.db)
        .await
        .context("insert item")?;
        Ok(())
    }

    async fn update(&self, item: &ListItem) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE list_items
               SET name = $2, quantity = $3, category = $4
             WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(&item.category)
        .execute(&self.db)
        .await
        .context("update item")?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM list_items WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete item")?;
        Ok(res.rows_affected() > 0)
    }
}
