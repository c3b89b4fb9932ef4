//! Error types for LocalLibrary server

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Application error codes reported in error bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchData = 4,
    BadValue = 5,
    Duplicate = 6,
    StillReferenced = 7,
    InvalidTransition = 8,
}

/// Field name -> messages, as a form would render them next to each input
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid form data")]
    Form(FieldErrors),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),
}

impl AppError {
    /// Single-field form error
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(name.to_string(), vec![message.into()]);
        AppError::Form(fields)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        AppError::Form(fields)
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, ErrorCode, String) {
        match self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::Form(_) => (
                StatusCode::BAD_REQUEST,
                ErrorCode::BadValue,
                "Invalid form data".to_string(),
            ),
            AppError::Database(sqlx::Error::Database(db)) => match db.kind() {
                ErrorKind::UniqueViolation => (
                    StatusCode::CONFLICT,
                    ErrorCode::Duplicate,
                    "A record with this value already exists".to_string(),
                ),
                ErrorKind::ForeignKeyViolation => (
                    StatusCode::CONFLICT,
                    ErrorCode::StillReferenced,
                    "Record is referenced by, or references, another record".to_string(),
                ),
                _ => {
                    tracing::error!("Database error: {:?}", db);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorCode::DbFailure,
                        "Database error".to_string(),
                    )
                }
            },
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::BusinessRule(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorCode::InvalidTransition,
                msg.clone(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let fields = match self {
            AppError::Form(fields) => Some(fields),
            _ => None,
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            fields,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
