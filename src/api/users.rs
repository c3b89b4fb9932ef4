//! User management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        pagination::PageQuery,
        user::{CreateUser, User, UserShort},
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Page of users", body = PaginatedResponse<UserShort>),
        (status = 403, description = "Insufficient rights", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<UserShort>>> {
    claims.require_read_users()?;

    let page = query.resolve(state.config.pagination.per_page);
    let (items, total) = state.services.users.list(page).await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        page: page.page,
        per_page: page.per_page,
    }))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<User>> {
    // Users can always read their own account
    if claims.user_id != id {
        claims.require_read_users()?;
    }

    let user = state.services.users.get_by_id(id).await?;
    Ok(Json(user))
}

/// Create a user account
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 409, description = "Username already taken", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    claims.require_write_users()?;
    data.validate()?;

    let user = state.services.users.create_user(data).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_write_users()?;

    state.services.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
