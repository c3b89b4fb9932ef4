//! Catalog home page

use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::book_instance::BookInstanceView,
    services::sessions::{is_valid_session_id, new_session_id, SESSION_COOKIE},
};

/// Home page summary
#[derive(Serialize, ToSchema)]
pub struct CatalogHome {
    pub num_books: i64,
    pub num_instances: i64,
    /// Copies with status "Available"
    pub num_instances_available: i64,
    pub num_authors: i64,
    pub book_instances: Vec<BookInstanceView>,
    /// Visits to this page earlier in the session
    pub num_visits: i64,
}

/// Reuse the caller's session or start a new one
fn ensure_session(jar: CookieJar) -> (CookieJar, String) {
    if let Some(id) = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|id| is_valid_session_id(id))
    {
        return (jar, id);
    }

    let id = new_session_id();
    let cookie = Cookie::build((SESSION_COOKIE, id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (jar.add(cookie), id)
}

/// Catalog home: counts, all copies and the session visit counter
#[utoipa::path(
    get,
    path = "/catalog",
    tag = "catalog",
    responses(
        (status = 200, description = "Catalog summary", body = CatalogHome)
    )
)]
pub async fn index(
    State(state): State<crate::AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<CatalogHome>)> {
    let (jar, session_id) = ensure_session(jar);

    let counts = state.services.catalog.counts().await?;
    let book_instances = state.services.catalog.all_instances().await?;
    let num_visits = state.services.sessions.record_visit(&session_id).await?;

    Ok((
        jar,
        Json(CatalogHome {
            num_books: counts.num_books,
            num_instances: counts.num_instances,
            num_instances_available: counts.num_instances_available,
            num_authors: counts.num_authors,
            book_instances,
            num_visits,
        }),
    ))
}
