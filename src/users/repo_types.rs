use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};

/// Account record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string, never exposed
    pub nike_name: String,
    pub birthday: Option<Date>,
    pub about: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields written at signup.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
}

/// The only fields an edit may change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub nike_name: String,
    pub birthday: Date,
    pub about: String,
}
