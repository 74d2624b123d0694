//! Course and user lookups the attendance engine depends on

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{course::Course, user::User},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Directory: Send + Sync {
    async fn get_course(&self, course_id: i64) -> AppResult<Option<Course>>;

    async fn get_courses(&self, course_ids: &[i64]) -> AppResult<Vec<Course>>;

    /// Whether the professor is assigned to the course
    async fn teaches(&self, professor_id: i64, course_id: i64) -> AppResult<bool>;

    async fn is_enrolled(&self, student_id: i64, course_id: i64) -> AppResult<bool>;

    async fn get_user(&self, user_id: i64) -> AppResult<Option<User>>;

    /// Users for the given ids, ordered by id
    async fn get_users(&self, user_ids: &[i64]) -> AppResult<Vec<User>>;

    /// Round trip to the backing store
    async fn ping(&self) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PgDirectory {
    pool: Pool<Postgres>,
}

impl PgDirectory {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn get_course(&self, course_id: i64) -> AppResult<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(
            "SELECT id, course_code, course_name FROM courses WHERE id = $1",
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(course)
    }

    async fn get_courses(&self, course_ids: &[i64]) -> AppResult<Vec<Course>> {
        if course_ids.is_empty() {
            return Ok(Vec::new());
        }
        let courses = sqlx::query_as::<_, Course>(
            "SELECT id, course_code, course_name FROM courses WHERE id = ANY($1) ORDER BY id",
        )
        .bind(course_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(courses)
    }

    async fn teaches(&self, professor_id: i64, course_id: i64) -> AppResult<bool> {
        let teaches: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_courses uc
                JOIN users u ON u.id = uc.user_id
                WHERE uc.user_id = $1 AND uc.course_id = $2 AND u.role = 'professor'
            )
            "#,
        )
        .bind(professor_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(teaches)
    }

    async fn is_enrolled(&self, student_id: i64, course_id: i64) -> AppResult<bool> {
        let enrolled: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_courses WHERE user_id = $1 AND course_id = $2)",
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(enrolled)
    }

    async fn get_user(&self, user_id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, full_name, email, role, student_id FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_users(&self, user_ids: &[i64]) -> AppResult<Vec<User>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, full_name, email, role, student_id
            FROM users
            WHERE id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
