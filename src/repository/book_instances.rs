//! Book instances repository: copies and their loan state

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book_instance::{BookInstance, CreateBookInstance, LoanStatus},
        pagination::Page,
    },
};

const INSTANCE_SELECT: &str = r#"
    SELECT bi.id, bi.book_id, bi.imprint, bi.due_back, bi.borrower_id, bi.status,
           b.title AS book_title, u.username AS borrower_username
    FROM book_instances bi
    LEFT JOIN books b ON bi.book_id = b.id
    LEFT JOIN users u ON bi.borrower_id = u.id
"#;

#[derive(Clone)]
pub struct BookInstancesRepository {
    pool: Pool<Postgres>,
}

impl BookInstancesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Every copy, ordered by due date
    pub async fn list_all(&self) -> AppResult<Vec<BookInstance>> {
        let query = format!("{} ORDER BY bi.due_back, bi.id", INSTANCE_SELECT);
        let rows = sqlx::query_as::<_, BookInstance>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<BookInstance> {
        let query = format!("{} WHERE bi.id = $1", INSTANCE_SELECT);
        sqlx::query_as::<_, BookInstance>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book instance {} not found", id)))
    }

    pub async fn for_book(&self, book_id: i32) -> AppResult<Vec<BookInstance>> {
        let query = format!("{} WHERE bi.book_id = $1 ORDER BY bi.due_back, bi.id", INSTANCE_SELECT);
        let rows = sqlx::query_as::<_, BookInstance>(&query)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_by_status(&self, status: LoanStatus) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_instances WHERE status = $1")
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Copies on loan, optionally restricted to one borrower, ordered by due date
    pub async fn list_on_loan(
        &self,
        borrower_id: Option<i32>,
        page: Page,
    ) -> AppResult<(Vec<BookInstance>, i64)> {
        let where_clause = if borrower_id.is_some() {
            "WHERE bi.status = $1 AND bi.borrower_id = $2"
        } else {
            "WHERE bi.status = $1"
        };

        let count_q = format!("SELECT COUNT(*) FROM book_instances bi {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q).bind(LoanStatus::OnLoan);
        if let Some(id) = borrower_id {
            count_builder = count_builder.bind(id);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let (limit_idx, offset_idx) = if borrower_id.is_some() { (3, 4) } else { (2, 3) };
        let select_q = format!(
            "{} {} ORDER BY bi.due_back, bi.id LIMIT ${} OFFSET ${}",
            INSTANCE_SELECT, where_clause, limit_idx, offset_idx
        );
        let mut builder = sqlx::query_as::<_, BookInstance>(&select_q).bind(LoanStatus::OnLoan);
        if let Some(id) = borrower_id {
            builder = builder.bind(id);
        }
        let rows = builder
            .bind(page.per_page)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn create(&self, data: &CreateBookInstance) -> AppResult<BookInstance> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO book_instances (id, book_id, imprint, due_back, status)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(data.book_id)
        .bind(&data.imprint)
        .bind(data.due_back)
        .bind(data.status.unwrap_or_default())
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM book_instances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book instance {} not found", id)));
        }
        Ok(())
    }

    /// Move a copy from `from` to `to`. Returns false when the copy is no longer in `from`.
    pub async fn update_status(&self, id: Uuid, from: LoanStatus, to: LoanStatus) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE book_instances
            SET status = $3,
                borrower_id = CASE WHEN $3 = 'o' THEN borrower_id ELSE NULL END,
                due_back = CASE WHEN $3 = 'o' THEN due_back ELSE NULL END
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Lend a copy that is available or reserved
    pub async fn borrow(&self, id: Uuid, borrower_id: i32, due_back: NaiveDate) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE book_instances
            SET status = 'o', borrower_id = $2, due_back = $3
            WHERE id = $1 AND status IN ('a', 'r')
            "#,
        )
        .bind(id)
        .bind(borrower_id)
        .bind(due_back)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Put a copy on loan back on the shelf
    pub async fn mark_returned(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE book_instances
            SET status = 'a', borrower_id = NULL, due_back = NULL
            WHERE id = $1 AND status = 'o'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn set_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<()> {
        let result = sqlx::query("UPDATE book_instances SET due_back = $2 WHERE id = $1")
            .bind(id)
            .bind(due_back)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book instance {} not found", id)));
        }
        Ok(())
    }
}
