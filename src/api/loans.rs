//! Borrowed copies listings

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{book_instance::BookInstanceView, pagination::PageQuery},
};

use super::{AuthenticatedUser, PaginatedResponse};

/// Copies on loan to the current user, earliest due first
#[utoipa::path(
    get,
    path = "/catalog/mybooks",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Copies borrowed by the current user", body = PaginatedResponse<BookInstanceView>),
        (status = 401, description = "Not logged in", body = crate::error::ErrorResponse)
    )
)]
pub async fn my_borrowed(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<BookInstanceView>>> {
    let page = query.resolve(state.config.pagination.per_page);
    let (items, total) = state
        .services
        .loans
        .loans_for_user(claims.user_id, page)
        .await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        page: page.page,
        per_page: page.per_page,
    }))
}

/// Every copy on loan, for librarians
#[utoipa::path(
    get,
    path = "/catalog/borrowed",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "All borrowed copies", body = PaginatedResponse<BookInstanceView>),
        (status = 403, description = "Missing librarian permission", body = crate::error::ErrorResponse)
    )
)]
pub async fn all_borrowed(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<BookInstanceView>>> {
    claims.require_mark_returned()?;

    let page = query.resolve(state.config.pagination.per_page);
    let (items, total) = state.services.loans.all_loans(page).await?;

    Ok(Json(PaginatedResponse {
        items,
        total,
        page: page.page,
        per_page: page.per_page,
    }))
}
