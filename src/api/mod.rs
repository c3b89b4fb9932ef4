//! API handlers for LocalLibrary REST endpoints

pub mod auth;
pub mod authors;
pub mod books;
pub mod catalog;
pub mod genres;
pub mod health;
pub mod instances;
pub mod languages;
pub mod loans;
pub mod openapi;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::Redirect,
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Prefix all API routes are nested under
pub const API_PREFIX: &str = "/api/v1";

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.users.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Page content
    pub items: Vec<T>,
    /// Total number of rows
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Rows per page
    pub per_page: i64,
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/password", put(auth::change_password))
        // Catalog home
        .route("/catalog", get(catalog::index))
        // Books
        .route("/catalog/books", get(books::list_books).post(books::create_book))
        .route(
            "/catalog/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Authors
        .route("/catalog/authors", get(authors::list_authors).post(authors::create_author))
        .route(
            "/catalog/authors/:id",
            get(authors::get_author)
                .put(authors::update_author)
                .delete(authors::delete_author),
        )
        // Genres
        .route("/catalog/genres", get(genres::list_genres).post(genres::create_genre))
        .route(
            "/catalog/genres/:id",
            get(genres::get_genre).delete(genres::delete_genre),
        )
        // Languages
        .route(
            "/catalog/languages",
            get(languages::list_languages).post(languages::create_language),
        )
        .route(
            "/catalog/languages/:id",
            get(languages::get_language).delete(languages::delete_language),
        )
        // Book instances
        .route("/catalog/bookinstances", post(instances::create_instance))
        .route(
            "/catalog/bookinstances/:id",
            get(instances::get_instance).delete(instances::delete_instance),
        )
        .route("/catalog/bookinstances/:id/status", put(instances::update_status))
        .route("/catalog/bookinstances/:id/borrow", post(instances::borrow))
        .route("/catalog/bookinstances/:id/return", post(instances::mark_returned))
        .route(
            "/catalog/bookinstances/:id/renew",
            get(instances::renew_form).post(instances::renew),
        )
        // Loans
        .route("/catalog/mybooks", get(loans::my_borrowed))
        .route("/catalog/borrowed", get(loans::all_borrowed))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id", get(users::get_user).delete(users::delete_user))
        .with_state(state);

    Router::new()
        .route(
            "/",
            get(|| async { Redirect::permanent(&format!("{}/catalog", API_PREFIX)) }),
        )
        .nest(API_PREFIX, api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
