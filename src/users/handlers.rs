use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{extractors::AuthUser, gate::client_fingerprint},
    state::AppState,
};

use super::{
    dto::{EditRequest, LoginRequest, MessageResponse, ProfileResponse, SignUpRequest},
    errors::AccountError,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/signup", post(sign_up))
        .route("/users/login", post(login))
        .route("/users/edit", post(edit))
        .route("/users/profile", post(profile))
}

#[instrument(skip(state, payload))]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<Json<MessageResponse>, AccountError> {
    state
        .accounts
        .sign_up(&payload.email, &payload.password, &payload.confirm_password)
        .await?;
    Ok(Json(MessageResponse {
        message: "signup succeeded",
    }))
}

#[instrument(skip(state, headers, payload))]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, Response> {
    let account = state
        .accounts
        .login(&payload.email, &payload.password)
        .await
        .map_err(IntoResponse::into_response)?;

    let issued = state
        .gate
        .sign_in(account.id, &client_fingerprint(&headers))
        .map_err(IntoResponse::into_response)?;

    Ok((
        issued,
        Json(MessageResponse {
            message: "login succeeded",
        }),
    )
        .into_response())
}

#[instrument(skip_all, fields(account_id = identity.account_id))]
pub async fn edit(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(payload): Json<EditRequest>,
) -> Result<Json<MessageResponse>, AccountError> {
    state
        .accounts
        .edit(
            identity.account_id,
            &payload.nike_name,
            &payload.birthday,
            &payload.about,
        )
        .await?;
    Ok(Json(MessageResponse {
        message: "profile updated",
    }))
}

#[instrument(skip_all, fields(account_id = identity.account_id))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<ProfileResponse>, AccountError> {
    let account = state.accounts.profile(identity.account_id).await?;
    Ok(Json(account.into()))
}
