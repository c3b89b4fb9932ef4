//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::book::BookShort;
use crate::error::{AppError, AppResult};

/// Author model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    /// Date of death ("Died")
    pub date_of_death: Option<NaiveDate>,
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

/// Author with their books
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorDetails {
    pub author: Author,
    /// Display name ("First Last")
    pub name: String,
    pub books: Vec<BookShort>,
}

/// Create author request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAuthor {
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

/// Update author request; dates are cleared by an explicit `null`
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateAuthor {
    #[validate(length(min = 1, max = 100, message = "First name must be 1-100 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Last name must be 1-100 characters"))]
    pub last_name: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<NaiveDate>, nullable)]
    pub date_of_birth: Option<Option<NaiveDate>>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<NaiveDate>, nullable)]
    pub date_of_death: Option<Option<NaiveDate>>,
}

impl UpdateAuthor {
    /// Lifespan after applying this update to `current`
    pub fn merged_lifespan(&self, current: &Author) -> (Option<NaiveDate>, Option<NaiveDate>) {
        (
            self.date_of_birth.unwrap_or(current.date_of_birth),
            self.date_of_death.unwrap_or(current.date_of_death),
        )
    }
}

/// An author cannot die before being born
pub fn check_lifespan(birth: Option<NaiveDate>, death: Option<NaiveDate>) -> AppResult<()> {
    match (birth, death) {
        (Some(b), Some(d)) if d < b => Err(AppError::field(
            "date_of_death",
            "Date of death is before date of birth",
        )),
        _ => Ok(()),
    }
}
