//! Genres repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::genre::{CreateGenre, Genre},
};

#[derive(Clone)]
pub struct GenresRepository {
    pool: Pool<Postgres>,
}

impl GenresRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List all genres by name
    pub async fn list(&self) -> AppResult<Vec<Genre>> {
        let rows = sqlx::query_as::<_, Genre>("SELECT id, name FROM genres ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Genre> {
        sqlx::query_as::<_, Genre>("SELECT id, name FROM genres WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Genre with id {} not found", id)))
    }

    /// Genres of a book, by id
    pub async fn for_book(&self, book_id: i32) -> AppResult<Vec<Genre>> {
        let rows = sqlx::query_as::<_, Genre>(
            r#"
            SELECT g.id, g.name
            FROM genres g
            JOIN book_genres bg ON bg.genre_id = g.id
            WHERE bg.book_id = $1
            ORDER BY g.id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Count how many of `ids` exist
    pub async fn count_existing(&self, ids: &[i32]) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM genres WHERE id = ANY($1)")
            .bind(ids)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Names are unique as stored; "Fantasy" and "fantasy" are distinct genres
    pub async fn create(&self, data: &CreateGenre) -> AppResult<Genre> {
        sqlx::query_as::<_, Genre>("INSERT INTO genres (name) VALUES ($1) RETURNING id, name")
            .bind(&data.name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::Conflict(format!("Genre '{}' already exists", data.name))
                }
                other => other.into(),
            })
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM genres WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Genre with id {} not found", id)));
        }
        Ok(())
    }
}
