//! Book endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        book::{BookDetails, BookShort, CreateBook, UpdateBook},
        pagination::PageQuery,
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List books
#[utoipa::path(
    get,
    path = "/catalog/books",
    tag = "books",
    params(PageQuery),
    responses(
        (status = 200, description = "Page of books", body = PaginatedResponse<BookShort>)
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<BookShort>>> {
    let page = query.resolve(state.config.pagination.per_page);
    let (items, total) = state.services.catalog.list_books(page).await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        page: page.page,
        per_page: page.per_page,
    }))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/catalog/books/{id}",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookDetails),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetails>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/catalog/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = BookDetails),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "ISBN already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<BookDetails>)> {
    claims.require_write_catalog()?;
    data.validate()?;

    let created = state.services.catalog.create_book(data).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a book
#[utoipa::path(
    put,
    path = "/catalog/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = BookDetails),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(data): Json<UpdateBook>,
) -> AppResult<Json<BookDetails>> {
    claims.require_write_catalog()?;
    data.validate()?;

    let updated = state.services.catalog.update_book(id, data).await?;
    Ok(Json(updated))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/catalog/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book still has copies", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_write_catalog()?;

    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
