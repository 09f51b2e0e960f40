use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use super::repo_types::{Account, NewAccount, ProfileUpdate};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("an account with this email already exists")]
    Duplicate,
    #[error("account not found")]
    NotFound,
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Duplicate,
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Keyed account storage. Implementations enforce email uniqueness and
/// assign ids that are never reused.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Account, StoreError>;
    async fn find_by_id(&self, id: i64) -> Result<Account, StoreError>;
    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> Result<(), StoreError>;
}

const ACCOUNT_COLUMNS: &str =
    "id, email, password_hash, nike_name, birthday, about, created_at, updated_at";

#[derive(Clone)]
pub struct PgAccountStore {
    db: PgPool,
}

impl PgAccountStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let row = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Account, StoreError> {
        let row = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Account, StoreError> {
        let row = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> Result<(), StoreError> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET nike_name = $2, birthday = $3, about = $4, updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&update.nike_name)
        .bind(update.birthday)
        .bind(&update.about)
        .execute(&self.db)
        .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
