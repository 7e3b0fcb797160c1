//! Registration, login and session handlers

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use pl_auth::Session;
use pl_contracts::users::{CredentialsParams, LoginContract, RegisterContract};
use pl_contracts::Contract;
use pl_db::{CreateUserDto, Repository, UserRepository};

use super::users::UserView;
use super::{
    created_with, hash_password_async, require_user, verify_password_async, with_message, wrap,
};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, CurrentUser, JsonBody};

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    JsonBody(params): JsonBody<CredentialsParams>,
) -> ApiResult<impl IntoResponse> {
    let credentials = RegisterContract.validate(params)?;
    let password_hash = hash_password_async(credentials.password).await?;

    let user = UserRepository::new(state.pool())
        .create(CreateUserDto {
            email: credentials.email,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = user.id, "User registered");
    created_with(
        "User registered successfully".into(),
        "user",
        &UserView::from(&user),
    )
}

/// POST /login
///
/// The password is checked before the account state so an inactive account
/// is only revealed to someone who knows its password.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(params): JsonBody<CredentialsParams>,
) -> ApiResult<impl IntoResponse> {
    let credentials = LoginContract.validate(params)?;

    let user = UserRepository::new(state.pool())
        .find_by_email(&credentials.email)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;
    if !verify_password_async(credentials.password, user.password_hash.clone()).await? {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    if !user.is_active {
        return Err(ApiError::forbidden("User account is not active"));
    }

    state.sessions.purge_expired()?;
    let session = Session::start(user.id, user.email.clone(), state.session_lifetime);
    let cookie = state.cookie.build_cookie(&session.id);
    state.sessions.insert(session)?;

    tracing::info!(user_id = user.id, "User logged in");
    let body = with_message("Login successful".into(), "user", &UserView::from(&user))?;
    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

/// POST /logout
pub async fn logout(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
) -> ApiResult<impl IntoResponse> {
    if let Some(user) = user {
        state.sessions.remove(&user.session_id)?;
        tracing::debug!(user_id = user.id, "User logged out");
    }
    Ok((
        [(header::SET_COOKIE, state.cookie.build_clear_cookie())],
        super::message("Logout successful".into()),
    ))
}

/// GET /profile
pub async fn profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<serde_json::Value>> {
    let user = require_user(&state.pool(), current.id).await?;
    Ok(Json(wrap("user", &UserView::from(&user))?))
}
