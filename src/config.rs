use std::fmt;

use anyhow::{bail, Context};

/// Minimum accepted length of an HMAC signing secret, in bytes.
const MIN_SECRET_LEN: usize = 32;
const MAX_HASH_WORKERS: usize = 256;
/// Requests waiting for a hashing worker beyond this are a misconfiguration.
const MAX_HASH_QUEUE_DEPTH: usize = 10_000;
const DEFAULT_HASH_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Signed bearer token, handed out in `x-jwt-token`.
    Jwt,
    /// Opaque `ssid` cookie backed by a server-side session table.
    Session,
}

impl AuthMode {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "jwt" | "token" => Ok(Self::Jwt),
            "session" | "cookie" => Ok(Self::Session),
            other => bail!("unknown AUTH_MODE `{other}` (expected `jwt` or `session`)"),
        }
    }
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Retired secrets still accepted for verification only.
    pub previous_secrets: Vec<String>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("previous_secrets", &self.previous_secrets.len())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct HashPoolConfig {
    pub workers: usize,
    pub queue_depth: usize,
}

impl HashPoolConfig {
    fn parse(
        workers: Option<&str>,
        queue_depth: Option<&str>,
        default_workers: usize,
    ) -> anyhow::Result<Self> {
        let workers = match workers {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("HASH_WORKERS `{raw}` is not a number"))?,
            None => default_workers.min(MAX_HASH_WORKERS),
        };
        if !(1..=MAX_HASH_WORKERS).contains(&workers) {
            bail!("HASH_WORKERS must be between 1 and {MAX_HASH_WORKERS}");
        }
        let queue_depth = match queue_depth {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("HASH_QUEUE_DEPTH `{raw}` is not a number"))?,
            None => DEFAULT_HASH_QUEUE_DEPTH,
        };
        if queue_depth > MAX_HASH_QUEUE_DEPTH {
            bail!("HASH_QUEUE_DEPTH must be at most {MAX_HASH_QUEUE_DEPTH}");
        }
        Ok(Self {
            workers,
            queue_depth,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub auth_mode: AuthMode,
    pub jwt: JwtConfig,
    pub hash_pool: HashPoolConfig,
    pub cors_allowed_domain: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let auth_mode = match std::env::var("AUTH_MODE") {
            Ok(v) => AuthMode::parse(&v)?,
            Err(_) => AuthMode::Jwt,
        };

        let secret = match (std::env::var("JWT_SECRET"), auth_mode) {
            (Ok(secret), _) => secret,
            (Err(_), AuthMode::Session) => String::new(),
            (Err(e), AuthMode::Jwt) => return Err(e).context("JWT_SECRET must be set"),
        };
        if auth_mode == AuthMode::Jwt && secret.len() < MIN_SECRET_LEN {
            bail!("JWT_SECRET must be at least {MIN_SECRET_LEN} bytes");
        }
        let previous_secrets = std::env::var("JWT_PREVIOUS_SECRETS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let default_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let hash_pool = HashPoolConfig::parse(
            std::env::var("HASH_WORKERS").ok().as_deref(),
            std::env::var("HASH_QUEUE_DEPTH").ok().as_deref(),
            default_workers,
        )?;

        let cors_allowed_domain = std::env::var("CORS_ALLOWED_DOMAIN")
            .ok()
            .filter(|v| !v.is_empty());

        Ok(Self {
            database_url,
            auth_mode,
            jwt: JwtConfig {
                secret,
                previous_secrets,
            },
            hash_pool,
            cors_allowed_domain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_mode_parses_aliases() {
        assert_eq!(AuthMode::parse("JWT").unwrap(), AuthMode::Jwt);
        assert_eq!(AuthMode::parse(" cookie ").unwrap(), AuthMode::Session);
        assert!(AuthMode::parse("basic").is_err());
    }

    #[test]
    fn jwt_config_debug_hides_secret() {
        let cfg = JwtConfig {
            secret: "super-secret-value-that-must-not-leak".into(),
            previous_secrets: vec!["old".into()],
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn hash_pool_defaults_when_unset() {
        let cfg = HashPoolConfig::parse(None, None, 4).unwrap();
        assert_eq!(cfg.workers, 4);
        assert_eq!(cfg.queue_depth, DEFAULT_HASH_QUEUE_DEPTH);

        let cfg = HashPoolConfig::parse(None, None, 4096).unwrap();
        assert_eq!(cfg.workers, MAX_HASH_WORKERS);
    }

    #[test]
    fn hash_pool_rejects_out_of_range_values() {
        let max = usize::MAX.to_string();
        assert!(HashPoolConfig::parse(None, Some(&max), 4).is_err());
        assert!(HashPoolConfig::parse(None, Some("10001"), 4).is_err());
        assert!(HashPoolConfig::parse(Some("0"), None, 4).is_err());
        assert!(HashPoolConfig::parse(Some("257"), None, 4).is_err());
        assert!(HashPoolConfig::parse(Some("many"), None, 4).is_err());

        let cfg = HashPoolConfig::parse(Some(" 8 "), Some("10000"), 4).unwrap();
        assert_eq!(cfg.workers, 8);
        assert_eq!(cfg.queue_depth, MAX_HASH_QUEUE_DEPTH);
    }
}
