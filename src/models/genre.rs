//! Genre model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::book::BookShort;

/// Book genre (e.g. "Science Fiction", "French Poetry")
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Genre with the books filed under it
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GenreDetails {
    pub genre: Genre,
    pub books: Vec<BookShort>,
}

/// Create genre request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateGenre {
    #[validate(length(min = 1, max = 200, message = "Genre name must be 1-200 characters"))]
    pub name: String,
}
