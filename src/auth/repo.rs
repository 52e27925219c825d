use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{Account, AccountRow};

/// Why an account insert was refused. Uniqueness is enforced by the store, so
/// a registration that loses a race still lands on a duplicate variant.
#[derive(Debug, Error)]
pub enum CreateAccountError {
    #[error("username already exists")]
    DuplicateUsername,
    #[error("email already registered")]
    DuplicateEmail,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Account persistence used by the auth flows.
#[async_trait]
pub trait AccountRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>>;
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<Account>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>>;
    async fn create(&self, account: &Account) -> Result<(), CreateAccountError>;
    /// Writes back the lockout counters. Last writer wins.
    async fn save_security(&self, account: &Account) -> anyhow::Result<()>;
}

const USERNAME_KEY: &str = "accounts_username_key";
const EMAIL_KEY: &str = "accounts_email_key";

fn duplicate_for_constraint(constraint: Option<&str>) -> Option<CreateAccountError> {
    match constraint {
        Some(USERNAME_KEY) => Some(CreateAccountError::DuplicateUsername),
        Some(EMAIL_KEY) => Some(CreateAccountError::DuplicateEmail),
        _ => None,
    }
}

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, \
     status, role, failed_login_attempts, lockout_until, created_at, updated_at";

#[derive(Clone)]
pub struct PgAccountRepo {
    db: PgPool,
}

impl PgAccountRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn find_one(&self, column: &str, value: &str) -> anyhow::Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {column} = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(&self.db)
            .await
            .with_context(|| format!("find account by {}", column))?;
        row.map(Account::try_from).transpose()
    }
}

#[async_trait]
impl AccountRepo for PgAccountRepo {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find account by id")?;
        row.map(Account::try_from).transpose()
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<Account>> {
        self.find_one("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<Account>> {
        self.find_one("email", email).await
    }

    async fn create(&self, account: &Account) -> Result<(), CreateAccountError> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (id, username, email, password_hash, first_name, last_name,
                                  status, role, failed_login_attempts, lockout_until,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.status.as_str())
        .bind(account.role.as_str())
        .bind(account.failed_login_attempts as i32)
        .bind(account.lockout_until)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                match duplicate_for_constraint(db.constraint()) {
                    Some(dup) => Err(dup),
                    None => Err(anyhow::Error::new(sqlx::Error::Database(db))
                        .context("insert account")
                        .into()),
                }
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert account").into()),
        }
    }

    async fn save_security(&self, account: &Account) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE accounts
               SET failed_login_attempts = $2,
                   lockout_until = $3,
                   updated_at = $4
             WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(account.failed_login_attempts as i32)
        .bind(account.lockout_until)
        .bind(account.updated_at)
        .execute(&self.db)
        .await
        .context("update account security")?;
        Ok(())
    }
}
