//! Author endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        author::{Author, AuthorDetails, CreateAuthor, UpdateAuthor},
        pagination::PageQuery,
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List authors by first name, then last name
#[utoipa::path(
    get,
    path = "/catalog/authors",
    tag = "authors",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of authors", body = PaginatedResponse<Author>)
    )
)]
pub async fn list_authors(
    State(state): State<crate::AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<Author>>> {
    let page = query.resolve(state.config.pagination.per_page);
    let (items, total) = state.services.catalog.list_authors(page).await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        page: page.page,
        per_page: page.per_page,
    }))
}

/// Get an author and their books
#[utoipa::path(
    get,
    path = "/catalog/authors/{id}",
    tag = "authors",
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    responses(
        (status = 200, description = "Author details", body = AuthorDetails),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_author(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<AuthorDetails>> {
    let author = state.services.catalog.get_author(id).await?;
    Ok(Json(author))
}

#[utoipa::path(
    post,
    path = "/catalog/authors",
    tag = "authors",
    security(("bearer_auth" = [])),
    request_body = CreateAuthor,
    responses(
        (status = 201, description = "Author created", body = Author),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateAuthor>,
) -> AppResult<(StatusCode, Json<Author>)> {
    claims.require_write_catalog()?;
    data.validate()?;

    let author = state.services.catalog.create_author(data).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

#[utoipa::path(
    put,
    path = "/catalog/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    request_body = UpdateAuthor,
    responses(
        (status = 200, description = "Author updated", body = Author),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateAuthor>,
) -> AppResult<Json<Author>> {
    claims.require_write_catalog()?;
    data.validate()?;

    let author = state.services.catalog.update_author(id, data).await?;
    Ok(Json(author))
}

/// Delete an author with no books
#[utoipa::path(
    delete,
    path = "/catalog/authors/{id}",
    tag = "authors",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    responses(
        (status = 204, description = "Author deleted"),
        (status = 404, description = "Author not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Author still has books", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_write_catalog()?;

    state.services.catalog.delete_author(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
