//! Languages repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::language::{CreateLanguage, Language},
};

#[derive(Clone)]
pub struct LanguagesRepository {
    pool: Pool<Postgres>,
}

impl LanguagesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> AppResult<Vec<Language>> {
        let rows = sqlx::query_as::<_, Language>("SELECT id, name FROM languages ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Language> {
        sqlx::query_as::<_, Language>("SELECT id, name FROM languages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Language with id {} not found", id)))
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<Language>> {
        let row = sqlx::query_as::<_, Language>("SELECT id, name FROM languages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn create(&self, data: &CreateLanguage) -> AppResult<Language> {
        let language = sqlx::query_as::<_, Language>(
            "INSERT INTO languages (name) VALUES ($1) RETURNING id, name",
        )
        .bind(&data.name)
        .fetch_one(&self.pool)
        .await?;
        Ok(language)
    }

    /// Books in this language keep existing with no language
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM languages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Language with id {} not found", id)));
        }
        Ok(())
    }
}
