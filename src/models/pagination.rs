//! Page-number pagination shared by list endpoints

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

const MAX_PER_PAGE: i64 = 100;

/// Highest page whose offset still fits in an i64
const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;

/// Query parameters for paginated lists
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    /// Page number (1-based)
    pub page: Option<i64>,
    /// Items per page
    pub per_page: Option<i64>,
}

/// Resolved page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl Page {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

impl PageQuery {
    /// Clamp the requested window, falling back to `default_per_page`
    pub fn resolve(&self, default_per_page: i64) -> Page {
        Page {
            page: self.page.unwrap_or(1).clamp(1, MAX_PAGE),
            per_page: self
                .per_page
                .unwrap_or(default_per_page)
                .clamp(1, MAX_PER_PAGE),
        }
    }
}
