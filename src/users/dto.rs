use serde::{Deserialize, Serialize};

use super::{repo_types::Account, services::BIRTHDAY_FORMAT};

/// Request body for signup.
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for a profile edit. `birthday` is `YYYY-MM-DD`.
#[derive(Debug, Deserialize)]
pub struct EditRequest {
    #[serde(default)]
    pub nike_name: String,
    #[serde(default)]
    pub birthday: String,
    #[serde(default)]
    pub about: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Public part of the account returned to the client.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub email: String,
    pub nike_name: String,
    pub birthday: String,
    pub about: String,
}

impl From<Account> for ProfileResponse {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            email: a.email,
            nike_name: a.nike_name,
            birthday: a
                .birthday
                .and_then(|d| d.format(BIRTHDAY_FORMAT).ok())
                .unwrap_or_default(),
            about: a.about,
        }
    }
}
