use std::{fmt, sync::Arc};

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration, OffsetDateTime};
use tracing::{debug, warn};

use super::{
    claims::{IdentityClaims, TokenClaims},
    errors::AuthError,
};
use crate::config::JwtConfig;

/// Fixed lifetime of an issued token and of an idle server-side session.
pub const SESSION_TTL: Duration = Duration::minutes(15);

/// Source of HMAC keys. Tokens are always signed with the active key and
/// accepted if any verification key matches, so keys can be rotated without
/// touching the token format.
pub trait KeySet: Send + Sync {
    fn signing_key(&self) -> &EncodingKey;
    fn verification_keys(&self) -> &[DecodingKey];
}

/// Keys loaded once at startup and never changed afterwards.
pub struct StaticKeySet {
    signing: EncodingKey,
    verifying: Vec<DecodingKey>,
}

impl StaticKeySet {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            signing: EncodingKey::from_secret(secret),
            verifying: vec![DecodingKey::from_secret(secret)],
        }
    }

    /// Accept tokens signed with `secret` as well, without signing new ones with it.
    pub fn with_retired(mut self, secret: &[u8]) -> Self {
        self.verifying.push(DecodingKey::from_secret(secret));
        self
    }
}

impl From<&JwtConfig> for StaticKeySet {
    fn from(cfg: &JwtConfig) -> Self {
        cfg.previous_secrets
            .iter()
            .fold(Self::from_secret(cfg.secret.as_bytes()), |keys, old| {
                keys.with_retired(old.as_bytes())
            })
    }
}

impl fmt::Debug for StaticKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticKeySet")
            .field("verification_keys", &self.verifying.len())
            .finish_non_exhaustive()
    }
}

impl KeySet for StaticKeySet {
    fn signing_key(&self) -> &EncodingKey {
        &self.signing
    }

    fn verification_keys(&self) -> &[DecodingKey] {
        &self.verifying
    }
}

/// Issues and parses HS256 identity tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: Arc<dyn KeySet>,
}

impl TokenIssuer {
    pub fn new(keys: Arc<dyn KeySet>) -> Self {
        Self { keys }
    }

    pub fn issue(&self, account_id: i64, fingerprint: &str) -> Result<String, AuthError> {
        self.issue_at(account_id, fingerprint, OffsetDateTime::now_utc())
    }

    pub fn issue_at(
        &self,
        account_id: i64,
        fingerprint: &str,
        now: OffsetDateTime,
    ) -> Result<String, AuthError> {
        let claims = TokenClaims {
            uid: account_id,
            iat: now.unix_timestamp(),
            exp: (now + SESSION_TTL).unix_timestamp(),
            user_agent: fingerprint.to_owned(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            self.keys.signing_key(),
        )
        .map_err(|e| AuthError::Issue(e.to_string()))?;
        debug!(account_id, "jwt signed");
        Ok(token)
    }

    pub fn parse(&self, token: &str, fingerprint: &str) -> Result<IdentityClaims, AuthError> {
        self.parse_at(token, fingerprint, OffsetDateTime::now_utc())
    }

    /// Signature first, then expiry against `now`, then the client fingerprint.
    pub fn parse_at(
        &self,
        token: &str,
        fingerprint: &str,
        now: OffsetDateTime,
    ) -> Result<IdentityClaims, AuthError> {
        let claims = self.verify_signature(token)?;

        if now.unix_timestamp() >= claims.exp {
            debug!(account_id = claims.uid, "jwt expired");
            return Err(AuthError::TokenExpired);
        }
        if claims.user_agent != fingerprint {
            warn!(account_id = claims.uid, "jwt presented by a different client");
            return Err(AuthError::TokenFingerprintMismatch);
        }

        let expires_at =
            OffsetDateTime::from_unix_timestamp(claims.exp).map_err(|_| AuthError::TokenInvalid)?;
        debug!(account_id = claims.uid, "jwt verified");
        Ok(IdentityClaims {
            account_id: claims.uid,
            issued_client_fingerprint: claims.user_agent,
            expires_at,
        })
    }

    fn verify_signature(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by the caller against an explicit clock.
        validation.validate_exp = false;
        validation.leeway = 0;

        for key in self.keys.verification_keys() {
            match decode::<TokenClaims>(token, key, &validation) {
                Ok(data) => return Ok(data.claims),
                Err(e) if matches!(e.kind(), ErrorKind::InvalidSignature) => continue,
                Err(e) => {
                    debug!(error = %e, "jwt rejected");
                    return Err(AuthError::TokenInvalid);
                }
            }
        }
        debug!("jwt signature matches no verification key");
        Err(AuthError::TokenInvalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test_secret_key_for_testing_purposes_only";
    const UA: &str = "Mozilla/5.0 (X11; Linux x86_64)";

    fn issuer(keys: StaticKeySet) -> TokenIssuer {
        TokenIssuer::new(Arc::new(keys))
    }

    fn tamper(token: &str) -> String {
        let sig_start = token.rfind('.').unwrap() + 1;
        let mut bytes = token.as_bytes().to_vec();
        let i = sig_start + 5;
        bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn issue_then_parse_returns_account() {
        let issuer = issuer(StaticKeySet::from_secret(SECRET));
        let now = OffsetDateTime::now_utc();
        let token = issuer.issue_at(42, UA, now).expect("issue");
        let claims = issuer.parse_at(&token, UA, now + Duration::minutes(14)).expect("parse");
        assert_eq!(claims.account_id, 42);
        assert_eq!(claims.issued_client_fingerprint, UA);
        assert_eq!(
            claims.expires_at.unix_timestamp(),
            (now + SESSION_TTL).unix_timestamp()
        );
    }

    #[test]
    fn parse_with_wall_clock() {
        let issuer = issuer(StaticKeySet::from_secret(SECRET));
        let token = issuer.issue(7, UA).unwrap();
        assert_eq!(issuer.parse(&token, UA).unwrap().account_id, 7);
    }

    #[test]
    fn expired_after_fifteen_minutes() {
        let issuer = issuer(StaticKeySet::from_secret(SECRET));
        let now = OffsetDateTime::now_utc();
        let token = issuer.issue_at(1, UA, now).unwrap();
        let err = issuer
            .parse_at(&token, UA, now + Duration::minutes(15))
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn tampered_signature_is_invalid() {
        let issuer = issuer(StaticKeySet::from_secret(SECRET));
        let token = issuer.issue(1, UA).unwrap();
        let err = issuer.parse(&tamper(&token), UA).unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[test]
    fn signature_is_checked_before_expiry() {
        let issuer = issuer(StaticKeySet::from_secret(SECRET));
        let now = OffsetDateTime::now_utc();
        let token = issuer.issue_at(1, UA, now - Duration::hours(1)).unwrap();
        let err = issuer.parse_at(&tamper(&token), UA, now).unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[test]
    fn garbage_is_invalid() {
        let issuer = issuer(StaticKeySet::from_secret(SECRET));
        for token in ["", "abc", "a.b.c", "....."] {
            let err = issuer.parse(token, UA).unwrap_err();
            assert!(matches!(err, AuthError::TokenInvalid), "{token:?}");
        }
    }

    #[test]
    fn fingerprint_mismatch_is_rejected() {
        let issuer = issuer(StaticKeySet::from_secret(SECRET));
        let token = issuer.issue(1, UA).unwrap();
        let err = issuer.parse(&token, "curl/8.0").unwrap_err();
        assert!(matches!(err, AuthError::TokenFingerprintMismatch));
    }

    #[test]
    fn foreign_key_is_invalid() {
        let ours = issuer(StaticKeySet::from_secret(SECRET));
        let theirs = issuer(StaticKeySet::from_secret(b"another_secret_of_sufficient_length!!"));
        let token = theirs.issue(1, UA).unwrap();
        assert!(matches!(
            ours.parse(&token, UA).unwrap_err(),
            AuthError::TokenInvalid
        ));
    }

    #[test]
    fn retired_key_still_verifies() {
        let old_secret = b"the_previous_secret_key_value_xxxxxxx";
        let old = issuer(StaticKeySet::from_secret(old_secret));
        let rotated = issuer(StaticKeySet::from_secret(SECRET).with_retired(old_secret));
        let token = old.issue(9, UA).unwrap();
        assert_eq!(rotated.parse(&token, UA).unwrap().account_id, 9);
    }

    #[test]
    fn key_set_from_config() {
        let cfg = JwtConfig {
            secret: "s".repeat(32),
            previous_secrets: vec!["p".repeat(32), "q".repeat(32)],
        };
        let keys = StaticKeySet::from(&cfg);
        assert_eq!(keys.verification_keys().len(), 3);
    }
}
