//! LocalLibrary
//!
//! Catalog and loans server for a small local library, providing a REST JSON
//! API over books, authors, genres, languages and the physical copies lent to
//! readers.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
