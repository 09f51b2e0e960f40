use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Verified identity attached to a request once it passes the auth gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub account_id: i64,
    pub issued_client_fingerprint: String,
    pub expires_at: OffsetDateTime,
}

/// JWT payload used on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TokenClaims {
    pub uid: i64,        // account id
    pub iat: i64,        // issued at (unix timestamp)
    pub exp: i64,        // expires at (unix timestamp)
    pub user_agent: String,
}
