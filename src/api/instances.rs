//! Book instance (copy) endpoints: stock management and the loan workflow

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book_instance::{
        BookInstanceView, BorrowRequest, CreateBookInstance, RenewBookForm, RenewalProposal,
        UpdateStatus,
    },
};

use super::{AuthenticatedUser, API_PREFIX};

/// Create a copy of a book
#[utoipa::path(
    post,
    path = "/catalog/bookinstances",
    tag = "bookinstances",
    security(("bearer_auth" = [])),
    request_body = CreateBookInstance,
    responses(
        (status = 201, description = "Copy created", body = BookInstanceView),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_instance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateBookInstance>,
) -> AppResult<(StatusCode, Json<BookInstanceView>)> {
    claims.require_write_catalog()?;
    data.validate()?;

    let instance = state.services.loans.create_instance(data).await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

#[utoipa::path(
    get,
    path = "/catalog/bookinstances/{id}",
    tag = "bookinstances",
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Copy details", body = BookInstanceView),
        (status = 404, description = "Copy not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_instance(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BookInstanceView>> {
    let instance = state.services.loans.get_instance(id).await?;
    Ok(Json(instance))
}

#[utoipa::path(
    delete,
    path = "/catalog/bookinstances/{id}",
    tag = "bookinstances",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    responses(
        (status = 204, description = "Copy deleted"),
        (status = 404, description = "Copy not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_instance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    claims.require_write_catalog()?;

    state.services.loans.delete_instance(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move a copy to another status (maintenance, available, reserved)
#[utoipa::path(
    put,
    path = "/catalog/bookinstances/{id}/status",
    tag = "bookinstances",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    request_body = UpdateStatus,
    responses(
        (status = 200, description = "Status changed", body = BookInstanceView),
        (status = 404, description = "Copy not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateStatus>,
) -> AppResult<Json<BookInstanceView>> {
    claims.require_write_catalog()?;

    let instance = state.services.loans.change_status(id, data.status).await?;
    Ok(Json(instance))
}

/// Lend an available or reserved copy
#[utoipa::path(
    post,
    path = "/catalog/bookinstances/{id}/borrow",
    tag = "bookinstances",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    request_body = BorrowRequest,
    responses(
        (status = 200, description = "Copy lent", body = BookInstanceView),
        (status = 403, description = "Missing librarian permission", body = crate::error::ErrorResponse),
        (status = 422, description = "Copy cannot be lent", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<BorrowRequest>,
) -> AppResult<Json<BookInstanceView>> {
    claims.require_mark_returned()?;

    let instance = state.services.loans.borrow(id, request).await?;
    Ok(Json(instance))
}

/// Mark a copy on loan as returned
#[utoipa::path(
    post,
    path = "/catalog/bookinstances/{id}/return",
    tag = "bookinstances",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Copy returned", body = BookInstanceView),
        (status = 422, description = "Copy is not on loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn mark_returned(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BookInstanceView>> {
    claims.require_mark_returned()?;

    let instance = state.services.loans.mark_returned(id).await?;
    Ok(Json(instance))
}

/// Renewal form with the proposed date
#[utoipa::path(
    get,
    path = "/catalog/bookinstances/{id}/renew",
    tag = "bookinstances",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    responses(
        (status = 200, description = "Renewal proposal", body = RenewalProposal),
        (status = 403, description = "Missing librarian permission", body = crate::error::ErrorResponse),
        (status = 404, description = "Copy not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn renew_form(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RenewalProposal>> {
    claims.require_mark_returned()?;

    let proposal = state.services.loans.renewal_proposal(id).await?;
    Ok(Json(proposal))
}

/// Unreadable dates are reported on the form field; other body errors stay generic
fn renewal_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(_) => AppError::field("renewal_date", "Enter a valid date."),
        other => AppError::BadRequest(other.body_text()),
    }
}

/// Submit the renewal form; redirects to the borrowed list on success
#[utoipa::path(
    post,
    path = "/catalog/bookinstances/{id}/renew",
    tag = "bookinstances",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Copy ID")
    ),
    request_body = RenewBookForm,
    responses(
        (status = 303, description = "Renewed, see the borrowed list"),
        (status = 400, description = "Invalid renewal date", body = crate::error::ErrorResponse),
        (status = 404, description = "Copy not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn renew(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    form: Result<Json<RenewBookForm>, JsonRejection>,
) -> AppResult<Redirect> {
    claims.require_mark_returned()?;
    let Json(form) = form.map_err(renewal_rejection)?;

    state.services.loans.renew(id, form).await?;
    Ok(Redirect::to(&format!("{}/catalog/borrowed", API_PREFIX)))
}
