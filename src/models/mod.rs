//! Data models for LocalLibrary

pub mod author;
pub mod book;
pub mod book_instance;
pub mod genre;
pub mod language;
pub mod pagination;
pub mod user;

// Re-export commonly used types
pub use author::Author;
pub use book::{Book, BookShort};
pub use book_instance::{BookInstance, BookInstanceView, LoanStatus};
pub use genre::Genre;
pub use language::Language;
pub use pagination::PageQuery;
pub use user::{AccountType, User, UserClaims, UserShort};
