use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::{AccountRepo, CreateAccountError},
        repo_types::Account,
    },
    items::{repo::ItemRepo, repo_types::ListItem},
};

/// Non-durable store for tests and local runs without PostgreSQL.
#[derive(Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
    items: RwLock<HashMap<Uuid, ListItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn set_status(&self, id: Uuid, status: crate::auth::repo_types::AccountStatus) {
        if let Some(a) = self.accounts.write().await.get_mut(&id) {
            a.status = status;
        }
    }
}

#[async_trait]
impl AccountRepo for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>> {
        Ok(self.accounts.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn create(&self, account: &Account) -> Result<(), CreateAccountError> {
        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.username == account.username) {
            return Err(CreateAccountError::DuplicateUsername);
        }
        if accounts.values().any(|a| a.email == account.email) {
            return Err(CreateAccountError::DuplicateEmail);
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn save_security(&self, account: &Account) -> anyhow::Result<()> {
        let mut accounts = self.accounts.write().await;
        let stored = accounts
            .get_mut(&account.id)
            .ok_or_else(|| anyhow::anyhow!("account {} not found", account.id))?;
        stored.failed_login_attempts = account.failed_login_attempts;
        stored.lockout_until = account.lockout_until;
        stored.updated_at = account.updated_at;
        Ok(())
    }
}

#[async_trait]
impl ItemRepo for MemoryStore {
    async fn list_by_owner(
        &self,
        owner_id: Uuid,
        limit: Option<i64>,
        offset: i64,
    ) -> anyhow::Result<Vec<ListItem>> {
        let items = self.items.read().await;
        let mut owned: Vec<ListItem> = items
            .values()
            .filter(|i| i.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.map_or(usize::MAX, |l| l.max(0) as usize))
            .collect())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<ListItem>> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn insert(&self, item: &ListItem) -> anyhow::Result<()> {
        self.items.write().await.insert(item.id, item.clone());
        Ok(())
    }

    async fn update(&self, item: &ListItem) -> anyhow::Result<()> {
        let mut items = self.items.write().await;
        let stored = items
            .get_mut(&item.id)
            .ok_or_else(|| anyhow::anyhow!("item {} not found", item.id))?;
        *stored = item.clone();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.items.write().await.remove(&id).is_some())
    }
}
