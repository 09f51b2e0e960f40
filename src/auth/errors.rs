use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

/// Failures of the identity boundary.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credential presented")]
    Unauthenticated,
    #[error("token is malformed or its signature does not verify")]
    TokenInvalid,
    #[error("token has expired")]
    TokenExpired,
    #[error("token was issued to a different client")]
    TokenFingerprintMismatch,
    #[error("session is unknown or expired")]
    SessionExpired,
    #[error("failed to issue credential: {0}")]
    Issue(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Issue(ref detail) => {
                error!(error = %detail, "credential issue failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "system error").into_response()
            }
            other => {
                warn!(reason = %other, "request rejected as unauthenticated");
                (StatusCode::UNAUTHORIZED, "unauthenticated").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_rejections_render_identically() {
        for err in [
            AuthError::Unauthenticated,
            AuthError::TokenInvalid,
            AuthError::TokenExpired,
            AuthError::TokenFingerprintMismatch,
            AuthError::SessionExpired,
        ] {
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
        let res = AuthError::Issue("boom".into()).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
