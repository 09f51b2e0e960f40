//! Request gating for protected routes.
//!
//! Two interchangeable implementations sit behind [`AuthGate`]: a stateless
//! signed-token gate and a cookie-backed server-side session gate. Neither
//! talks to account storage.

use std::sync::Arc;

use axum::http::{
    header::{AUTHORIZATION, COOKIE, SET_COOKIE, USER_AGENT},
    HeaderMap, HeaderName, HeaderValue,
};
use time::OffsetDateTime;

use super::{
    claims::IdentityClaims,
    errors::AuthError,
    jwt::{TokenIssuer, SESSION_TTL},
    session::SessionStore,
};

/// Response header carrying a freshly issued token.
pub const TOKEN_HEADER: HeaderName = HeaderName::from_static("x-jwt-token");
pub const SESSION_COOKIE: &str = "ssid";

pub trait AuthGate: Send + Sync {
    /// Establishes identity after a successful login and returns the headers
    /// the client needs to present it on later requests.
    fn sign_in(&self, account_id: i64, fingerprint: &str) -> Result<HeaderMap, AuthError>;

    /// Verifies the credential carried by `headers`.
    fn authenticate(&self, headers: &HeaderMap) -> Result<IdentityClaims, AuthError>;
}

/// The client string bound into credentials at sign-in.
pub fn client_fingerprint(headers: &HeaderMap) -> String {
    headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

pub struct JwtGate {
    issuer: TokenIssuer,
}

impl JwtGate {
    pub fn new(issuer: TokenIssuer) -> Self {
        Self { issuer }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim_start();
    let token = raw
        .strip_prefix("Bearer ")
        .or_else(|| raw.strip_prefix("bearer "))
        .unwrap_or(raw)
        .trim();
    (!token.is_empty()).then_some(token)
}

impl AuthGate for JwtGate {
    fn sign_in(&self, account_id: i64, fingerprint: &str) -> Result<HeaderMap, AuthError> {
        let token = self.issuer.issue(account_id, fingerprint)?;
        let value = HeaderValue::from_str(&token).map_err(|e| AuthError::Issue(e.to_string()))?;
        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, value);
        Ok(headers)
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<IdentityClaims, AuthError> {
        let token = bearer_token(headers).ok_or(AuthError::Unauthenticated)?;
        self.issuer.parse(token, &client_fingerprint(headers))
    }
}

pub struct SessionGate {
    store: Arc<SessionStore>,
}

impl SessionGate {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value)
}

impl AuthGate for SessionGate {
    fn sign_in(&self, account_id: i64, fingerprint: &str) -> Result<HeaderMap, AuthError> {
        let id = self
            .store
            .create(account_id, fingerprint, OffsetDateTime::now_utc());
        let cookie = format!(
            "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            SESSION_TTL.whole_seconds()
        );
        let value = HeaderValue::from_str(&cookie).map_err(|e| AuthError::Issue(e.to_string()))?;
        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, value);
        Ok(headers)
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<IdentityClaims, AuthError> {
        let id = session_cookie(headers).ok_or(AuthError::Unauthenticated)?;
        self.store
            .touch(id, &client_fingerprint(headers), OffsetDateTime::now_utc())
    }
}
