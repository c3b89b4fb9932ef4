//! Users repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        pagination::Page,
        user::{AccountType, CreateUser, User, UserShort},
    },
};

const USER_COLUMNS: &str =
    "id, username, password, first_name, last_name, email, account_type, date_joined";

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by username (case-insensitive)
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let query = format!(
            "SELECT {} FROM users WHERE LOWER(username) = LOWER($1)",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = LOWER($1))",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn list(&self, page: Page) -> AppResult<(Vec<UserShort>, i64)> {
        let total = self.count().await?;

        let rows = sqlx::query_as::<_, UserShort>(
            r#"
            SELECT id, username, first_name, last_name, account_type
            FROM users
            ORDER BY username
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Insert a user; `password_hash` is the already hashed password
    pub async fn create(&self, data: &CreateUser, password_hash: &str) -> AppResult<User> {
        let query = format!(
            r#"
            INSERT INTO users (username, password, first_name, last_name, email, account_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&data.username)
            .bind(password_hash)
            .bind(&data.first_name)
            .bind(&data.last_name)
            .bind(&data.email)
            .bind(data.account_type.unwrap_or(AccountType::Reader))
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn update_password(&self, id: i32, password_hash: &str) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET password = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }

    /// Delete a user; their borrowed copies lose the borrower reference
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }
}
