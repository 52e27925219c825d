use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    auth::{
        jwt::JwtKeys,
        lockout::LockoutPolicy,
        password::PasswordHasher,
        repo::{AccountRepo, PgAccountRepo},
        services::AuthService,
        subscription::SubscriptionGate,
    },
    config::AppConfig,
    items::{
        repo::{ItemRepo, PgItemRepo},
        services::ItemService,
    },
    storage::MemoryStore,
};

#[derive(Clone)]
pub struct AppState {
    pub subscriptions: Arc<SubscriptionGate>,
    pub keys: JwtKeys,
    pub auth: AuthService,
    pub items: ItemService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let (accounts, items): (Arc<dyn AccountRepo>, Arc<dyn ItemRepo>) =
            match &config.database_url {
                Some(url) => {
                    let db = PgPoolOptions::new()
                        .max_connections(config.db_max_connections)
                        .connect(url)
                        .await
                        .context("connect to database")?;
                    sqlx::migrate!("./migrations")
                        .run(&db)
                        .await
                        .context("run migrations")?;
                    (
                        Arc::new(PgAccountRepo::new(db.clone())) as Arc<dyn AccountRepo>,
                        Arc::new(PgItemRepo::new(db)) as Arc<dyn ItemRepo>,
                    )
                }
                None => {
                    tracing::warn!("DATABASE_URL not set; using in-memory store, data is lost on exit");
                    let store = Arc::new(MemoryStore::new());
                    (
                        store.clone() as Arc<dyn AccountRepo>,
                        store as Arc<dyn ItemRepo>,
                    )
                }
            };

        Self::from_parts(&config, accounts, items)
    }

    pub fn from_parts(
        config: &AppConfig,
        accounts: Arc<dyn AccountRepo>,
        items: Arc<dyn ItemRepo>,
    ) -> anyhow::Result<Self> {
        let keys = JwtKeys::new(&config.jwt);
        let hasher = PasswordHasher::new(&config.hashing)?;
        let lockout = LockoutPolicy::from(&config.lockout);
        let subscriptions = Arc::new(SubscriptionGate::new(config.subscription_keys.clone()));

        Ok(Self {
            auth: AuthService::new(accounts, hasher, keys.clone(), lockout),
            items: ItemService::new(items),
            subscriptions,
            keys,
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::from_parts(&AppConfig::for_tests(), store.clone(), store)
            .expect("test config is valid")
    }
}
