//! Language endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::language::{CreateLanguage, Language, LanguageDetails},
};

use super::AuthenticatedUser;

#[utoipa::path(
    get,
    path = "/catalog/languages",
    tag = "languages",
    responses(
        (status = 200, description = "All languages", body = Vec<Language>)
    )
)]
pub async fn list_languages(
    State(state): State<crate::AppState>,
) -> AppResult<Json<Vec<Language>>> {
    let languages = state.services.catalog.list_languages().await?;
    Ok(Json(languages))
}

#[utoipa::path(
    get,
    path = "/catalog/languages/{id}",
    tag = "languages",
    params(
        ("id" = i32, Path, description = "Language ID")
    ),
    responses(
        (status = 200, description = "Language details", body = LanguageDetails),
        (status = 404, description = "Language not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_language(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<LanguageDetails>> {
    let language = state.services.catalog.get_language(id).await?;
    Ok(Json(language))
}

#[utoipa::path(
    post,
    path = "/catalog/languages",
    tag = "languages",
    security(("bearer_auth" = [])),
    request_body = CreateLanguage,
    responses(
        (status = 201, description = "Language created", body = Language),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_language(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateLanguage>,
) -> AppResult<(StatusCode, Json<Language>)> {
    claims.require_write_catalog()?;
    data.validate()?;

    let language = state.services.catalog.create_language(data).await?;
    Ok((StatusCode::CREATED, Json(language)))
}

/// Delete a language; its books keep existing without one
#[utoipa::path(
    delete,
    path = "/catalog/languages/{id}",
    tag = "languages",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Language ID")
    ),
    responses(
        (status = 204, description = "Language deleted"),
        (status = 404, description = "Language not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_language(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_write_catalog()?;

    state.services.catalog.delete_language(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
