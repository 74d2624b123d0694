//! Class-day counter resets repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::error::AppResult;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResetStore: Send + Sync {
    async fn get_reset(&self, professor_id: i64, course_id: i64) -> AppResult<Option<DateTime<Utc>>>;

    /// Insert or move the (professor, course) reset instant
    async fn upsert_reset(&self, professor_id: i64, course_id: i64, at: DateTime<Utc>) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgResetStore {
    pool: Pool<Postgres>,
}

impl PgResetStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetStore for PgResetStore {
    async fn get_reset(&self, professor_id: i64, course_id: i64) -> AppResult<Option<DateTime<Utc>>> {
        let reset_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT reset_at FROM course_attendance_resets WHERE professor_id = $1 AND course_id = $2",
        )
        .bind(professor_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reset_at)
    }

    async fn upsert_reset(&self, professor_id: i64, course_id: i64, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO course_attendance_resets (professor_id, course_id, reset_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (professor_id, course_id) DO UPDATE SET reset_at = EXCLUDED.reset_at
            "#,
        )
        .bind(professor_id)
        .bind(course_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
