use std::sync::Arc;

use time::{format_description::FormatItem, macros::format_description, Date};
use tracing::{info, instrument, warn};

use crate::auth::{hash_pool::HashingPool, validation::Validator};

use super::{
    errors::AccountError,
    repo::{AccountStore, StoreError},
    repo_types::{Account, NewAccount, ProfileUpdate},
};

pub const BIRTHDAY_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Signup, login, profile edit and profile lookup over an [`AccountStore`].
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    validator: Validator,
    pool: HashingPool,
    /// Verified against when the email is unknown, so both login failures
    /// cost the same.
    dummy_hash: Arc<str>,
}

impl AccountService {
    pub async fn new(
        store: Arc<dyn AccountStore>,
        validator: Validator,
        pool: HashingPool,
    ) -> Result<Self, AccountError> {
        let dummy_hash = pool.hash("not-a-real-password-0".to_owned()).await?;
        Ok(Self {
            store,
            validator,
            pool,
            dummy_hash: dummy_hash.into(),
        })
    }

    #[instrument(skip(self, password, confirm_password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Account, AccountError> {
        if !self.validator.validate_email(email) {
            warn!("signup rejected: malformed email");
            return Err(AccountError::Validation("invalid email format"));
        }
        if password != confirm_password {
            warn!("signup rejected: passwords differ");
            return Err(AccountError::PasswordMismatch);
        }
        if !self.validator.validate_password(password) {
            warn!("signup rejected: weak password");
            return Err(AccountError::Validation(
                "password must be at least 8 characters with upper, lower case letters and a digit",
            ));
        }

        let password_hash = self.pool.hash(password.to_owned()).await?;
        let account = self
            .store
            .create(NewAccount {
                email: email.to_owned(),
                password_hash,
            })
            .await
            .map_err(|e| {
                if matches!(e, StoreError::Duplicate) {
                    warn!("signup rejected: email taken");
                }
                AccountError::from(e)
            })?;

        info!(account_id = account.id, "account created");
        Ok(account)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Account, AccountError> {
        let (account, hash) = match self.store.find_by_email(email).await {
            Ok(account) => {
                let hash = account.password_hash.clone();
                (Some(account), hash)
            }
            Err(StoreError::NotFound) => (None, self.dummy_hash.to_string()),
            Err(e) => return Err(e.into()),
        };

        let matched = self.pool.verify(hash, password.to_owned()).await?;
        match account {
            Some(account) if matched => {
                info!(account_id = account.id, "login succeeded");
                Ok(account)
            }
            _ => {
                warn!("login rejected");
                Err(AccountError::InvalidCredentials)
            }
        }
    }

    #[instrument(skip(self, nike_name, about))]
    pub async fn edit(
        &self,
        account_id: i64,
        nike_name: &str,
        birthday: &str,
        about: &str,
    ) -> Result<(), AccountError> {
        let birthday = parse_birthday(birthday)?;
        self.store
            .update_profile(
                account_id,
                ProfileUpdate {
                    nike_name: nike_name.to_owned(),
                    birthday,
                    about: about.to_owned(),
                },
            )
            .await?;
        info!(account_id, "profile updated");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn profile(&self, account_id: i64) -> Result<Account, AccountError> {
        Ok(self.store.find_by_id(account_id).await?)
    }
}

pub fn parse_birthday(raw: &str) -> Result<Date, AccountError> {
    Date::parse(raw, BIRTHDAY_FORMAT).map_err(|_| AccountError::InvalidDate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::password::PasswordHasher, users::memory::MemoryAccountStore};
    use time::macros::date;

    async fn service() -> AccountService {
        AccountService::new(
            Arc::new(MemoryAccountStore::new()),
            Validator::new().unwrap(),
            HashingPool::new(PasswordHasher::new(), 4, 64),
        )
        .await
        .expect("service builds")
    }

    #[tokio::test]
    async fn signup_once_then_duplicate() {
        let svc = service().await;
        let acct = svc.sign_up("a@b.co", "Abcdef12", "Abcdef12").await.unwrap();
        assert_eq!(acct.email, "a@b.co");
        assert!(!acct.password_hash.is_empty());
        assert_ne!(acct.password_hash, "Abcdef12");
        assert!(acct.nike_name.is_empty() && acct.about.is_empty() && acct.birthday.is_none());

        let err = svc.sign_up("a@b.co", "Abcdef12", "Abcdef12").await.unwrap_err();
        assert!(matches!(err, AccountError::DuplicateAccount));
    }

    #[tokio::test]
    async fn signup_validation_failures() {
        let svc = service().await;
        assert!(matches!(
            svc.sign_up("bad", "Abcdef12", "Abcdef12").await.unwrap_err(),
            AccountError::Validation(_)
        ));
        assert!(matches!(
            svc.sign_up("a@b.co", "abcdefgh", "abcdefgh").await.unwrap_err(),
            AccountError::Validation(_)
        ));
        assert!(matches!(
            svc.sign_up("a@b.co", "Abcdef12", "Abcdef13").await.unwrap_err(),
            AccountError::PasswordMismatch
        ));
    }

    #[tokio::test]
    async fn login_success_returns_account() {
        let svc = service().await;
        let created = svc.sign_up("a@b.co", "Abcdef12", "Abcdef12").await.unwrap();
        let got = svc.login("a@b.co", "Abcdef12").await.unwrap();
        assert_eq!(got.id, created.id);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let svc = service().await;
        svc.sign_up("a@b.co", "Abcdef12", "Abcdef12").await.unwrap();

        let wrong_password = svc.login("a@b.co", "Abcdef99").await.unwrap_err();
        let no_account = svc.login("nobody@b.co", "Abcdef12").await.unwrap_err();
        assert!(matches!(wrong_password, AccountError::InvalidCredentials));
        assert!(matches!(no_account, AccountError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), no_account.to_string());
        assert_eq!(wrong_password.status(), no_account.status());
    }

    #[tokio::test]
    async fn edit_rejects_bad_date_and_profile_reflects_good_one() {
        let svc = service().await;
        let acct = svc.sign_up("a@b.co", "Abcdef12", "Abcdef12").await.unwrap();

        let err = svc.edit(acct.id, "neo", "2024-13-01", "hi").await.unwrap_err();
        assert!(matches!(err, AccountError::InvalidDate));
        assert!(matches!(
            svc.edit(acct.id, "neo", "", "hi").await.unwrap_err(),
            AccountError::InvalidDate
        ));

        svc.edit(acct.id, "neo", "2024-01-15", "hi").await.unwrap();
        let profile = svc.profile(acct.id).await.unwrap();
        assert_eq!(profile.nike_name, "neo");
        assert_eq!(profile.birthday, Some(date!(2024 - 01 - 15)));
        assert_eq!(profile.about, "hi");
        assert_eq!(profile.email, "a@b.co");
        assert_eq!(profile.password_hash, acct.password_hash);
    }

    #[tokio::test]
    async fn profile_of_unknown_id_is_not_found() {
        let svc = service().await;
        assert!(matches!(
            svc.profile(404).await.unwrap_err(),
            AccountError::NotFound
        ));
    }

    #[tokio::test]
    async fn concurrent_signups_with_distinct_emails_all_succeed() {
        let svc = service().await;
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let svc = svc.clone();
                tokio::spawn(async move {
                    svc.sign_up(&format!("user{i}@b.co"), "Abcdef12", "Abcdef12")
                        .await
                })
            })
            .collect();
        for h in handles {
            assert!(h.await.unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn concurrent_signups_with_same_email_yield_one_winner() {
        let svc = service().await;
        let n = 8;
        let handles: Vec<_> = (0..n)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.sign_up("same@b.co", "Abcdef12", "Abcdef12").await })
            })
            .collect();
        let mut ok = 0;
        let mut dup = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(AccountError::DuplicateAccount) => dup += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(dup, n - 1);
    }

    #[test]
    fn birthday_parsing() {
        assert_eq!(parse_birthday("2024-01-15").unwrap(), date!(2024 - 01 - 15));
        assert!(parse_birthday("2024-02-30").is_err());
        assert!(parse_birthday("15/01/2024").is_err());
        assert!(parse_birthday("2024-1-15").is_err());
    }

    #[test]
    fn birthday_must_match_exactly() {
        assert!(matches!(
            parse_birthday(" 2024-01-15 "),
            Err(AccountError::InvalidDate)
        ));
        assert!(parse_birthday("2024-01-15\n").is_err());
        assert!(parse_birthday("\t2024-01-15").is_err());
    }
}
