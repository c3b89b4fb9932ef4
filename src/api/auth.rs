//! Authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::user::{AccountType, ChangePassword, User},
    services::sessions::{is_valid_session_id, SESSION_COOKIE},
};

use super::AuthenticatedUser;

/// Login request
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response with JWT token
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: u64,
    pub user: UserInfo,
}

/// Current user information
#[derive(Serialize, ToSchema)]
pub struct UserInfo {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub account_type: AccountType,
    /// Librarian permission to manage borrowed copies
    pub can_mark_returned: bool,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        UserInfo {
            can_mark_returned: user.account_type.rights().can_mark_returned(),
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            account_type: user.account_type,
        }
    }
}

/// Authenticate and obtain a token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, user) = state
        .services
        .users
        .authenticate(&request.username, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.users.jwt_expiration_hours * 3600,
        user: user.into(),
    }))
}

/// End the browser session (visit counter included)
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    responses(
        (status = 204, description = "Session cleared")
    )
)]
pub async fn logout(
    State(state): State<crate::AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, StatusCode)> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if is_valid_session_id(cookie.value()) {
            state.services.sessions.flush(cookie.value()).await?;
        }
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, StatusCode::NO_CONTENT))
}

/// Get current user information
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UserInfo>> {
    let user = state.services.users.get_by_id(claims.user_id).await?;
    Ok(Json(user.into()))
}

/// Change own password
#[utoipa::path(
    put,
    path = "/auth/password",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = ChangePassword,
    responses(
        (status = 204, description = "Password changed"),
        (status = 400, description = "Invalid form", body = crate::error::ErrorResponse)
    )
)]
pub async fn change_password(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<ChangePassword>,
) -> AppResult<StatusCode> {
    data.validate()?;
    state
        .services
        .users
        .change_password(claims.user_id, &data)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
