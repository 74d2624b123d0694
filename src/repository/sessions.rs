//! Attendance sessions repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::session::{AttendanceSession, NewSession},
};

use super::is_unique_violation;

/// Persistence of attendance sessions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert an active session. Returns `None` when another active session
    /// of the same course already holds the code.
    async fn insert(&self, session: &NewSession) -> AppResult<Option<AttendanceSession>>;

    async fn get_by_id(&self, id: i64) -> AppResult<Option<AttendanceSession>>;

    /// Active, unexpired session of `course_id` carrying exactly `code`
    async fn find_live_by_code(
        &self,
        course_id: i64,
        code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<AttendanceSession>>;

    /// Active, unexpired sessions opened by a professor, newest first
    async fn list_live_for_professor(
        &self,
        professor_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceSession>>;

    /// Distinct class days of a professor's sessions for a course, created
    /// strictly after `after` when given
    async fn count_class_days(
        &self,
        professor_id: i64,
        course_id: i64,
        after: Option<DateTime<Utc>>,
    ) -> AppResult<i64>;

    /// Flip every active session with `expires_at <= now` to inactive
    async fn deactivate_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

#[derive(Clone)]
pub struct PgSessionStore {
    pool: Pool<Postgres>,
}

impl PgSessionStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &NewSession) -> AppResult<Option<AttendanceSession>> {
        // uq_attendance_sessions_live_code rejects a code already held by an active session
        let result = sqlx::query_as::<_, AttendanceSession>(
            r#"
            INSERT INTO attendance_sessions
                (course_id, professor_id, verification_code, created_at, expires_at, class_day, active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING *
            "#,
        )
        .bind(session.course_id)
        .bind(session.professor_id)
        .bind(&session.verification_code)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(session.class_day)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(Some(row)),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Option<AttendanceSession>> {
        let row = sqlx::query_as::<_, AttendanceSession>(
            "SELECT * FROM attendance_sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_live_by_code(
        &self,
        course_id: i64,
        code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<AttendanceSession>> {
        let row = sqlx::query_as::<_, AttendanceSession>(
            r#"
            SELECT * FROM attendance_sessions
            WHERE course_id = $1
              AND verification_code = $2
              AND active
              AND expires_at > $3
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(course_id)
        .bind(code)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_live_for_professor(
        &self,
        professor_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceSession>> {
        let rows = sqlx::query_as::<_, AttendanceSession>(
            r#"
            SELECT * FROM attendance_sessions
            WHERE professor_id = $1 AND active AND expires_at > $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(professor_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_class_days(
        &self,
        professor_id: i64,
        course_id: i64,
        after: Option<DateTime<Utc>>,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT class_day)
            FROM attendance_sessions
            WHERE professor_id = $1
              AND course_id = $2
              AND ($3::timestamptz IS NULL OR created_at > $3)
            "#,
        )
        .bind(professor_id)
        .bind(course_id)
        .bind(after)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE attendance_sessions SET active = FALSE WHERE active AND expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
