//! Genre endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::genre::{CreateGenre, Genre, GenreDetails},
};

use super::AuthenticatedUser;

#[utoipa::path(
    get,
    path = "/catalog/genres",
    tag = "genres",
    responses(
        (status = 200, description = "All genres", body = Vec<Genre>)
    )
)]
pub async fn list_genres(State(state): State<crate::AppState>) -> AppResult<Json<Vec<Genre>>> {
    let genres = state.services.catalog.list_genres().await?;
    Ok(Json(genres))
}

/// Get a genre and its books
#[utoipa::path(
    get,
    path = "/catalog/genres/{id}",
    tag = "genres",
    params(
        ("id" = i32, Path, description = "Genre ID")
    ),
    responses(
        (status = 200, description = "Genre details", body = GenreDetails),
        (status = 404, description = "Genre not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_genre(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<GenreDetails>> {
    let genre = state.services.catalog.get_genre(id).await?;
    Ok(Json(genre))
}

#[utoipa::path(
    post,
    path = "/catalog/genres",
    tag = "genres",
    security(("bearer_auth" = [])),
    request_body = CreateGenre,
    responses(
        (status = 201, description = "Genre created", body = Genre),
        (status = 409, description = "Genre already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_genre(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateGenre>,
) -> AppResult<(StatusCode, Json<Genre>)> {
    claims.require_write_catalog()?;
    data.validate()?;

    let genre = state.services.catalog.create_genre(data).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

#[utoipa::path(
    delete,
    path = "/catalog/genres/{id}",
    tag = "genres",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Genre ID")
    ),
    responses(
        (status = 204, description = "Genre deleted"),
        (status = 404, description = "Genre not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_genre(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_write_catalog()?;

    state.services.catalog.delete_genre(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
