use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use super::{
    repo::{AccountStore, StoreError},
    repo_types::{Account, NewAccount, ProfileUpdate},
};

#[derive(Default)]
struct Tables {
    last_id: i64,
    by_id: HashMap<i64, Account>,
    id_by_email: HashMap<String, i64>,
}

/// Process-local account store for development and tests.
#[derive(Default)]
pub struct MemoryAccountStore {
    tables: Mutex<Tables>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut t = self.tables.lock().await;
        if t.id_by_email.contains_key(&account.email) {
            return Err(StoreError::Duplicate);
        }
        t.last_id += 1;
        let now = OffsetDateTime::now_utc();
        let row = Account {
            id: t.last_id,
            email: account.email,
            password_hash: account.password_hash,
            nike_name: String::new(),
            birthday: None,
            about: String::new(),
            created_at: now,
            updated_at: now,
        };
        t.id_by_email.insert(row.email.clone(), row.id);
        t.by_id.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Account, StoreError> {
        let t = self.tables.lock().await;
        t.id_by_email
            .get(email)
            .and_then(|id| t.by_id.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_id(&self, id: i64) -> Result<Account, StoreError> {
        let t = self.tables.lock().await;
        t.by_id.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update_profile(&self, id: i64, update: ProfileUpdate) -> Result<(), StoreError> {
        let mut t = self.tables.lock().await;
        let row = t.by_id.get_mut(&id).ok_or(StoreError::NotFound)?;
        row.nike_name = update.nike_name;
        row.birthday = Some(update.birthday);
        row.about = update.about;
        row.updated_at = OffsetDateTime::now_utc();
        Ok(())
    }
}
