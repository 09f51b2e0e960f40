use axum::{
    http::{header::RETRY_AFTER, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::auth::{
    hash_pool::PoolError, password::HashError, validation::ValidationEngineError,
};

use super::repo::StoreError;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(&'static str),
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("email is already registered")]
    DuplicateAccount,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("birthday must be a date in YYYY-MM-DD format")]
    InvalidDate,
    #[error("account not found")]
    NotFound,
    #[error("server is busy, retry later")]
    Busy,
    #[error(transparent)]
    ValidationEngine(#[from] ValidationEngineError),
    #[error(transparent)]
    Hashing(#[from] HashError),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl From<PoolError> for AccountError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::Busy => AccountError::Busy,
            PoolError::Hash(h) => AccountError::Hashing(h),
            PoolError::Join(j) => AccountError::Internal(j.to_string()),
        }
    }
}

impl From<StoreError> for AccountError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AccountError::DuplicateAccount,
            StoreError::NotFound => AccountError::NotFound,
            StoreError::Backend(detail) => AccountError::Storage(detail),
        }
    }
}

impl AccountError {
    pub fn status(&self) -> StatusCode {
        match self {
            AccountError::Validation(_)
            | AccountError::PasswordMismatch
            | AccountError::InvalidDate => StatusCode::BAD_REQUEST,
            AccountError::DuplicateAccount => StatusCode::CONFLICT,
            AccountError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AccountError::NotFound => StatusCode::NOT_FOUND,
            AccountError::Busy => StatusCode::SERVICE_UNAVAILABLE,
            AccountError::ValidationEngine(_)
            | AccountError::Hashing(_)
            | AccountError::Storage(_)
            | AccountError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let status = self.status();
        if matches!(self, AccountError::Busy) {
            return (status, [(RETRY_AFTER, "1")], self.to_string()).into_response();
        }
        if status.is_server_error() {
            error!(error = %self, "request failed");
            return (status, "system error").into_response();
        }
        (status, self.to_string()).into_response()
    }
}
