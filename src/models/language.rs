//! Language model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::book::BookShort;

/// Language a book is written in
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Language {
    pub id: i32,
    pub name: String,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LanguageDetails {
    pub language: Language,
    pub books: Vec<BookShort>,
}

/// Create language request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLanguage {
    /// Language name (e.g. "English", "French")
    #[validate(length(min = 1, max = 50, message = "Language name must be 1-50 characters"))]
    pub name: String,
}
