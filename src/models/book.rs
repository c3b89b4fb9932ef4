//! Book model (a title, not a physical copy)

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{author::Author, book_instance::BookInstanceView, genre::Genre, language::Language};

static ISBN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{13}$").unwrap());

/// Number of genres shown by `display_genre`
const DISPLAY_GENRE_LIMIT: usize = 3;

/// Book row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_id: Option<i32>,
    pub summary: String,
    /// 13 character ISBN
    pub isbn: String,
    pub language_id: Option<i32>,
}

impl std::fmt::Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

/// Short book representation for lists
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookShort {
    pub id: i32,
    pub title: String,
    pub author_id: Option<i32>,
    /// "First Last", None when the book has no author
    pub author_name: Option<String>,
}

/// Book with its relations resolved
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetails {
    pub id: i32,
    pub title: String,
    pub summary: String,
    pub isbn: String,
    pub author: Option<Author>,
    pub language: Option<Language>,
    pub genres: Vec<Genre>,
    /// First genres joined with ", "
    pub display_genre: String,
    pub instances: Vec<BookInstanceView>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    pub author_id: Option<i32>,
    #[validate(length(max = 1000, message = "Summary must be at most 1000 characters"))]
    pub summary: String,
    #[validate(regex(path = *ISBN_REGEX, message = "ISBN must be 13 digits"))]
    pub isbn: String,
    #[validate(length(min = 1, message = "Select at least one genre"))]
    pub genre_ids: Vec<i32>,
    pub language_id: Option<i32>,
}

/// Update book request; `genre_ids` replaces the whole set when present.
/// `author_id` and `language_id` are cleared by an explicit `null`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>, nullable)]
    pub author_id: Option<Option<i32>>,
    #[validate(length(max = 1000, message = "Summary must be at most 1000 characters"))]
    pub summary: Option<String>,
    #[validate(regex(path = *ISBN_REGEX, message = "ISBN must be 13 digits"))]
    pub isbn: Option<String>,
    #[validate(length(min = 1, message = "Select at least one genre"))]
    pub genre_ids: Option<Vec<i32>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<i32>, nullable)]
    pub language_id: Option<Option<i32>>,
}

pub fn display_genre(genres: &[Genre]) -> String {
    genres
        .iter()
        .take(DISPLAY_GENRE_LIMIT)
        .map(|g| g.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genre(id: i32, name: &str) -> Genre {
        Genre {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_display_genre_truncates() {
        let genres = vec![
            genre(1, "Fantasy"),
            genre(2, "Science Fiction"),
            genre(3, "Poetry"),
            genre(4, "History"),
        ];
        assert_eq!(display_genre(&genres), "Fantasy, Science Fiction, Poetry");
        assert_eq!(display_genre(&genres[..1]), "Fantasy");
        assert_eq!(display_genre(&[]), "");
    }

    #[test]
    fn test_isbn_validation() {
        let mut book = CreateBook {
            title: "The Dispossessed".to_string(),
            author_id: Some(1),
            summary: String::new(),
            isbn: "9780061054884".to_string(),
            genre_ids: vec![1],
            language_id: None,
        };
        assert!(book.validate().is_ok());

        book.isbn = "978-0061054884".to_string();
        let errors = book.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("isbn"));
    }

    #[test]
    fn test_update_clears_optional_refs() {
        let update: UpdateBook =
            serde_json::from_str(r#"{"title": "Excession", "language_id": null}"#).unwrap();
        assert_eq!(update.author_id, None);
        assert_eq!(update.language_id, Some(None));

        let update: UpdateBook = serde_json::from_str(r#"{"author_id": 3}"#).unwrap();
        assert_eq!(update.author_id, Some(Some(3)));
        assert!(update.validate().is_ok());
    }
}
