//! Authors repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor, UpdateAuthor},
        pagination::Page,
    },
};

const AUTHOR_COLUMNS: &str = "id, first_name, last_name, date_of_birth, date_of_death";

#[derive(Clone)]
pub struct AuthorsRepository {
    pool: Pool<Postgres>,
}

impl AuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List authors ordered by first name then last name
    pub async fn list(&self, page: Page) -> AppResult<(Vec<Author>, i64)> {
        let total = self.count().await?;

        let query = format!(
            "SELECT {} FROM authors ORDER BY first_name, last_name, id LIMIT $1 OFFSET $2",
            AUTHOR_COLUMNS
        );
        let rows = sqlx::query_as::<_, Author>(&query)
            .bind(page.per_page)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authors")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Author> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<Author>> {
        let query = format!("SELECT {} FROM authors WHERE id = $1", AUTHOR_COLUMNS);
        let row = sqlx::query_as::<_, Author>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn create(&self, data: &CreateAuthor) -> AppResult<Author> {
        let query = format!(
            r#"
            INSERT INTO authors (first_name, last_name, date_of_birth, date_of_death)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            AUTHOR_COLUMNS
        );
        let author = sqlx::query_as::<_, Author>(&query)
            .bind(&data.first_name)
            .bind(&data.last_name)
            .bind(data.date_of_birth.is_some())
            .bind(data.date_of_birth.flatten())
            .bind(data.date_of_death.is_some())
            .bind(data.date_of_death.flatten())
            .fetch_one(&self.pool)
            .await?;
        Ok(author)
    }

    /// Update the fields that are present
    pub async fn update(&self, id: i32, data: &UpdateAuthor) -> AppResult<Author> {
        let query = format!(
            r#"
            UPDATE authors SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                date_of_birth = CASE WHEN $4 THEN $5 ELSE date_of_birth END,
                date_of_death = CASE WHEN $6 THEN $7 ELSE date_of_death END
            WHERE id = $1
            RETURNING {}
            "#,
            AUTHOR_COLUMNS
        );
        sqlx::query_as::<_, Author>(&query)
            .bind(id)
            .bind(&data.first_name)
            .bind(&data.last_name)
            .bind(data.date_of_birth.is_some())
            .bind(data.date_of_birth.flatten())
            .bind(data.date_of_death.is_some())
            .bind(data.date_of_death.flatten())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author with id {} not found", id)))
    }

    /// Delete an author. Authors still referenced by books are kept.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let has_books: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE author_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if has_books {
            return Err(AppError::Conflict(format!(
                "Author with id {} still has books",
                id
            )));
        }

        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Author with id {} not found", id)));
        }
        Ok(())
    }
}
