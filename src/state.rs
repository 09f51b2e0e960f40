use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::{
    auth::{
        extractors::SharedGate,
        gate::{JwtGate, SessionGate},
        hash_pool::HashingPool,
        jwt::{StaticKeySet, TokenIssuer, SESSION_TTL},
        password::PasswordHasher,
        session::SessionStore,
        validation::Validator,
    },
    config::{AppConfig, AuthMode},
    users::{
        memory::MemoryAccountStore,
        repo::{AccountStore, PgAccountStore},
        errors::AccountError,
        services::AccountService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Option<PgPool>,
    pub accounts: AccountService,
    pub gate: SharedGate,
    /// Present in session mode so the janitor can purge idle sessions.
    pub sessions: Option<Arc<SessionStore>>,
}

impl FromRef<AppState> for SharedGate {
    fn from_ref(state: &AppState) -> Self {
        state.gate.clone()
    }
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let (db, store) = match &config.database_url {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                let store = Arc::new(PgAccountStore::new(db.clone())) as Arc<dyn AccountStore>;
                (Some(db), store)
            }
            None => {
                warn!("DATABASE_URL not set; accounts are kept in memory only");
                (None, Arc::new(MemoryAccountStore::new()) as Arc<dyn AccountStore>)
            }
        };

        Self::from_parts(config, db, store).await
    }

    pub async fn from_parts(
        config: Arc<AppConfig>,
        db: Option<PgPool>,
        store: Arc<dyn AccountStore>,
    ) -> anyhow::Result<Self> {
        let validator = Validator::new()
            .map_err(AccountError::from)
            .context("compile validation patterns")?;
        let pool = HashingPool::new(
            PasswordHasher::new(),
            config.hash_pool.workers,
            config.hash_pool.queue_depth,
        );
        let accounts = AccountService::new(store, validator, pool)
            .await
            .context("initialise account service")?;

        let (gate, sessions) = match config.auth_mode {
            AuthMode::Jwt => {
                let keys = Arc::new(StaticKeySet::from(&config.jwt));
                let gate = Arc::new(JwtGate::new(TokenIssuer::new(keys))) as SharedGate;
                (gate, None)
            }
            AuthMode::Session => {
                let store = Arc::new(SessionStore::new(SESSION_TTL));
                let gate = Arc::new(SessionGate::new(store.clone())) as SharedGate;
                (gate, Some(store))
            }
        };
        info!(auth_mode = ?config.auth_mode, "auth gate ready");

        Ok(Self {
            config,
            db,
            accounts,
            gate,
            sessions,
        })
    }

    /// In-memory state for tests.
    #[cfg(test)]
    pub async fn fake(auth_mode: AuthMode) -> Self {
        use crate::config::{HashPoolConfig, JwtConfig};

        let config = Arc::new(AppConfig {
            database_url: None,
            auth_mode,
            jwt: JwtConfig {
                secret: "test_secret_key_for_testing_purposes_only".into(),
                previous_secrets: Vec::new(),
            },
            hash_pool: HashPoolConfig {
                workers: 2,
                queue_depth: 16,
            },
            cors_allowed_domain: None,
        });
        Self::from_parts(config, None, Arc::new(MemoryAccountStore::new()))
            .await
            .expect("fake state builds")
    }
}
