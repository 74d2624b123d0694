//! Attendance records repository

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::attendance::{AttendanceRecord, NewAttendanceRecord},
};

use super::is_unique_violation;

/// The attendance ledger
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a verified record. Returns `None` when the student already has
    /// a record for that course and day.
    async fn insert(&self, record: &NewAttendanceRecord) -> AppResult<Option<AttendanceRecord>>;

    async fn find_for_day(
        &self,
        student_id: i64,
        course_id: i64,
        day: NaiveDate,
    ) -> AppResult<Option<AttendanceRecord>>;

    /// Distinct students with a verified record for the session
    async fn list_attendee_ids(&self, session_id: i64) -> AppResult<Vec<i64>>;

    /// A student's records for a course, oldest first
    async fn list_for_student(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> AppResult<Vec<AttendanceRecord>>;

    /// Every record of a course on one calendar day, oldest first
    async fn list_for_course_day(
        &self,
        course_id: i64,
        day: NaiveDate,
    ) -> AppResult<Vec<AttendanceRecord>>;
}

#[derive(Clone)]
pub struct PgRecordStore {
    pool: Pool<Postgres>,
}

impl PgRecordStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn insert(&self, record: &NewAttendanceRecord) -> AppResult<Option<AttendanceRecord>> {
        // uq_attendance_records_daily settles concurrent redemptions
        let result = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            INSERT INTO attendance_records
                (student_id, course_id, session_id, timestamp, attendance_day, verified)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING *
            "#,
        )
        .bind(record.student_id)
        .bind(record.course_id)
        .bind(record.session_id)
        .bind(record.timestamp)
        .bind(record.attendance_day)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(Some(row)),
            Err(e) if is_unique_violation(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_for_day(
        &self,
        student_id: i64,
        course_id: i64,
        day: NaiveDate,
    ) -> AppResult<Option<AttendanceRecord>> {
        let row = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT * FROM attendance_records
            WHERE student_id = $1 AND course_id = $2 AND attendance_day = $3
            LIMIT 1
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_attendee_ids(&self, session_id: i64) -> AppResult<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT student_id FROM attendance_records
            WHERE session_id = $1 AND verified
            ORDER BY student_id
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn list_for_student(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> AppResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT * FROM attendance_records
            WHERE student_id = $1 AND course_id = $2
            ORDER BY timestamp
            "#,
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_for_course_day(
        &self,
        course_id: i64,
        day: NaiveDate,
    ) -> AppResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT * FROM attendance_records
            WHERE course_id = $1 AND attendance_day = $2
            ORDER BY timestamp, id
            "#,
        )
        .bind(course_id)
        .bind(day)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
