//! Repository layer for database operations

pub mod authors;
pub mod book_instances;
pub mod books;
pub mod genres;
pub mod languages;
pub mod users;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub genres: genres::GenresRepository,
    pub languages: languages::LanguagesRepository,
    pub authors: authors::AuthorsRepository,
    pub books: books::BooksRepository,
    pub book_instances: book_instances::BookInstancesRepository,
    pub users: users::UsersRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            genres: genres::GenresRepository::new(pool.clone()),
            languages: languages::LanguagesRepository::new(pool.clone()),
            authors: authors::AuthorsRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            book_instances: book_instances::BookInstancesRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database, used by the readiness probe
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
