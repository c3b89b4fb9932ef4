//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    auth, authors, books, catalog, genres, health, instances, languages, loans, users,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LocalLibrary API",
        version = "1.0.0",
        description = "Local library catalog and loans REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::logout,
        auth::me,
        auth::change_password,
        // Catalog
        catalog::index,
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        genres::list_genres,
        genres::get_genre,
        genres::create_genre,
        genres::delete_genre,
        languages::list_languages,
        languages::get_language,
        languages::create_language,
        languages::delete_language,
        // Copies
        instances::create_instance,
        instances::get_instance,
        instances::delete_instance,
        instances::update_status,
        instances::borrow,
        instances::mark_returned,
        instances::renew_form,
        instances::renew,
        // Loans
        loans::my_borrowed,
        loans::all_borrowed,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::delete_user,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            auth::UserInfo,
            // Catalog
            catalog::CatalogHome,
            crate::models::book::Book,
            crate::models::book::BookShort,
            crate::models::book::BookDetails,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::author::Author,
            crate::models::author::AuthorDetails,
            crate::models::author::CreateAuthor,
            crate::models::author::UpdateAuthor,
            crate::models::genre::Genre,
            crate::models::genre::GenreDetails,
            crate::models::genre::CreateGenre,
            crate::models::language::Language,
            crate::models::language::LanguageDetails,
            crate::models::language::CreateLanguage,
            crate::models::pagination::PageQuery,
            // Copies
            crate::models::book_instance::LoanStatus,
            crate::models::book_instance::BookInstanceView,
            crate::models::book_instance::CreateBookInstance,
            crate::models::book_instance::UpdateStatus,
            crate::models::book_instance::BorrowRequest,
            crate::models::book_instance::RenewBookForm,
            crate::models::book_instance::RenewalProposal,
            // Users
            crate::models::user::AccountType,
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::CreateUser,
            crate::models::user::ChangePassword,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "catalog", description = "Catalog home page"),
        (name = "books", description = "Book management"),
        (name = "authors", description = "Author management"),
        (name = "genres", description = "Genre management"),
        (name = "languages", description = "Language management"),
        (name = "bookinstances", description = "Copies and the loan workflow"),
        (name = "loans", description = "Borrowed copies"),
        (name = "users", description = "User management")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
