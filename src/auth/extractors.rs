use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::debug;

use super::{claims::IdentityClaims, errors::AuthError, gate::AuthGate};

/// Gate shared by every protected route.
pub type SharedGate = Arc<dyn AuthGate>;

/// Verified identity of the caller. Handlers taking this extractor never run
/// for unauthenticated requests.
pub struct AuthUser(pub IdentityClaims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SharedGate: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = SharedGate::from_ref(state);
        let claims = gate.authenticate(&parts.headers)?;
        debug!(
            account_id = claims.account_id,
            expires_at = %claims.expires_at,
            "identity attached"
        );
        Ok(AuthUser(claims))
    }
}
