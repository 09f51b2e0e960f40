use dashmap::DashMap;
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::{claims::IdentityClaims, errors::AuthError};

#[derive(Debug, Clone)]
struct SessionRecord {
    account_id: i64,
    fingerprint: String,
    last_seen: OffsetDateTime,
}

/// Server-side sessions keyed by an opaque random id, expiring after
/// `idle_ttl` without use.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, SessionRecord>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
        }
    }

    pub fn create(&self, account_id: i64, fingerprint: &str, now: OffsetDateTime) -> String {
        let id = Uuid::new_v4().simple().to_string();
        self.sessions.insert(
            id.clone(),
            SessionRecord {
                account_id,
                fingerprint: fingerprint.to_owned(),
                last_seen: now,
            },
        );
        debug!(account_id, "session created");
        id
    }

    /// Resolves a session and slides its idle window forward.
    pub fn touch(
        &self,
        session_id: &str,
        fingerprint: &str,
        now: OffsetDateTime,
    ) -> Result<IdentityClaims, AuthError> {
        let mut entry = self
            .sessions
            .get_mut(session_id)
            .ok_or(AuthError::SessionExpired)?;

        if now - entry.last_seen >= self.idle_ttl {
            drop(entry);
            self.sessions.remove(session_id);
            debug!("session idle timeout");
            return Err(AuthError::SessionExpired);
        }
        if entry.fingerprint != fingerprint {
            return Err(AuthError::TokenFingerprintMismatch);
        }

        entry.last_seen = now;
        Ok(IdentityClaims {
            account_id: entry.account_id,
            issued_client_fingerprint: entry.fingerprint.clone(),
            expires_at: now + self.idle_ttl,
        })
    }

    /// Drops every session idle for longer than the ttl.
    pub fn purge_expired(&self, now: OffsetDateTime) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, record| now - record.last_seen < self.idle_ttl);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}
