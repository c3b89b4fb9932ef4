//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookShort, CreateBook, UpdateBook},
        pagination::Page,
    },
};

const BOOK_COLUMNS: &str = "id, title, author_id, summary, isbn, language_id";

const BOOK_SHORT_SELECT: &str = r#"
    SELECT b.id, b.title, b.author_id,
           CASE WHEN a.id IS NULL THEN NULL
                ELSE a.first_name || ' ' || a.last_name
           END AS author_name
    FROM books b
    LEFT JOIN authors a ON b.author_id = a.id
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List books with pagination
    pub async fn list(&self, page: Page) -> AppResult<(Vec<BookShort>, i64)> {
        let total = self.count().await?;

        let query = format!("{} ORDER BY b.id LIMIT $1 OFFSET $2", BOOK_SHORT_SELECT);
        let rows = sqlx::query_as::<_, BookShort>(&query)
            .bind(page.per_page)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let query = format!("SELECT {} FROM books WHERE id = $1", BOOK_COLUMNS);
        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub async fn exists(&self, id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn by_author(&self, author_id: i32) -> AppResult<Vec<BookShort>> {
        let query = format!("{} WHERE b.author_id = $1 ORDER BY b.title", BOOK_SHORT_SELECT);
        let rows = sqlx::query_as::<_, BookShort>(&query)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn by_genre(&self, genre_id: i32) -> AppResult<Vec<BookShort>> {
        let query = format!(
            "{} JOIN book_genres bg ON bg.book_id = b.id WHERE bg.genre_id = $1 ORDER BY b.title",
            BOOK_SHORT_SELECT
        );
        let rows = sqlx::query_as::<_, BookShort>(&query)
            .bind(genre_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn by_language(&self, language_id: i32) -> AppResult<Vec<BookShort>> {
        let query = format!("{} WHERE b.language_id = $1 ORDER BY b.title", BOOK_SHORT_SELECT);
        let rows = sqlx::query_as::<_, BookShort>(&query)
            .bind(language_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Create a book and its genre links
    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            r#"
            INSERT INTO books (title, author_id, summary, isbn, language_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        );
        let book = sqlx::query_as::<_, Book>(&query)
            .bind(&data.title)
            .bind(data.author_id.is_some())
            .bind(data.author_id.flatten())
            .bind(&data.summary)
            .bind(&data.isbn)
            .bind(data.language_id.is_some())
            .bind(data.language_id.flatten())
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO book_genres (book_id, genre_id)
            SELECT $1, UNNEST($2::int[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(book.id)
        .bind(&data.genre_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(book)
    }

    /// Update the fields that are present; `genre_ids` replaces the genre set
    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                author_id = CASE WHEN $3 THEN $4 ELSE author_id END,
                summary = COALESCE($5, summary),
                isbn = COALESCE($6, isbn),
                language_id = CASE WHEN $7 THEN $8 ELSE language_id END
            WHERE id = $1
            RETURNING {}
            "#,
            BOOK_COLUMNS
        );
        let book = sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .bind(&data.title)
            .bind(data.author_id.is_some())
            .bind(data.author_id.flatten())
            .bind(&data.summary)
            .bind(&data.isbn)
            .bind(data.language_id.is_some())
            .bind(data.language_id.flatten())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        if let Some(ref genre_ids) = data.genre_ids {
            sqlx::query("DELETE FROM book_genres WHERE book_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r#"
                INSERT INTO book_genres (book_id, genre_id)
                SELECT $1, UNNEST($2::int[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(id)
            .bind(genre_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(book)
    }

    /// Delete a book. Books with copies on record are kept.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let has_instances: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM book_instances WHERE book_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if has_instances {
            return Err(AppError::Conflict(format!(
                "Book with id {} still has copies",
                id
            )));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }
}
