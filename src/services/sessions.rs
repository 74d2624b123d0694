//! Attendance session management service

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, FixedOffset, Utc};

use crate::{
    clock::{calendar_day, Clock},
    config::AttendanceConfig,
    error::{AppError, AppResult},
    models::{
        session::{AttendanceSession, NewSession, SessionDescriptor},
        user::{StudentSummary, UserClaims},
    },
    repository::Repository,
    services::codes::generate_code,
};

#[derive(Clone)]
pub struct SessionService {
    repository: Repository,
    config: AttendanceConfig,
    day_offset: FixedOffset,
    clock: Arc<dyn Clock>,
}

impl SessionService {
    pub fn new(repository: Repository, config: AttendanceConfig, clock: Arc<dyn Clock>) -> Self {
        let day_offset = config.day_offset();
        Self {
            repository,
            config,
            day_offset,
            clock,
        }
    }

    /// Open an attendance window for a course and issue its code
    pub async fn create_session(
        &self,
        professor: &UserClaims,
        course_id: i64,
        expiry_minutes: i64,
    ) -> AppResult<SessionDescriptor> {
        professor.require_professor()?;

        let course = self
            .repository
            .directory
            .get_course(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course not found with ID: {}", course_id)))?;

        if !self
            .repository
            .directory
            .teaches(professor.user_id, course_id)
            .await?
        {
            return Err(AppError::Forbidden(
                "Professor is not associated with this course".to_string(),
            ));
        }

        if expiry_minutes <= 0 {
            return Err(AppError::InvalidArgument(
                "Expiry time must be positive".to_string(),
            ));
        }
        if expiry_minutes > self.config.max_expiry_minutes {
            return Err(AppError::InvalidArgument(format!(
                "Expiry time cannot exceed {} minutes",
                self.config.max_expiry_minutes
            )));
        }

        let now = self.clock.now();
        let expires_at = Duration::try_minutes(expiry_minutes)
            .and_then(|window| now.checked_add_signed(window))
            .ok_or_else(|| {
                AppError::InvalidArgument(format!("Expiry time out of range: {} minutes", expiry_minutes))
            })?;
        let class_day = calendar_day(now, self.day_offset);

        for attempt in 1..=self.config.max_code_attempts {
            let code = generate_code(self.config.code_length);

            if self
                .repository
                .sessions
                .find_live_by_code(course_id, &code, now)
                .await?
                .is_some()
            {
                tracing::debug!(course_id, attempt, "Verification code collision, regenerating");
                continue;
            }

            let new_session = NewSession {
                course_id,
                professor_id: professor.user_id,
                verification_code: code,
                created_at: now,
                expires_at,
                class_day,
            };

            // None: a concurrent session claimed the same code first
            match self.repository.sessions.insert(&new_session).await? {
                Some(session) => {
                    tracing::info!(
                        session_id = session.id,
                        course = %course.course_code,
                        professor = %professor.sub,
                        expires_at = %session.expires_at,
                        "Created attendance session"
                    );
                    return Ok(SessionDescriptor::new(&session, &course));
                }
                None => {
                    tracing::debug!(course_id, attempt, "Verification code taken concurrently, regenerating");
                }
            }
        }

        tracing::error!(
            course_id,
            attempts = self.config.max_code_attempts,
            "Failed to generate a unique verification code"
        );
        Err(AppError::Conflict(
            "Could not generate a unique verification code. Please try again.".to_string(),
        ))
    }

    /// The redemption gate: course and code match exactly, the session is
    /// active and `now` is before its expiry.
    pub async fn find_valid_session(
        &self,
        course_id: i64,
        code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<AttendanceSession>> {
        let session = self
            .repository
            .sessions
            .find_live_by_code(course_id, code, now)
            .await?;
        Ok(session.filter(|s| s.accepts(course_id, code, now)))
    }

    /// Live sessions opened by the caller
    pub async fn get_active_sessions_for_professor(
        &self,
        professor: &UserClaims,
    ) -> AppResult<Vec<SessionDescriptor>> {
        if !professor.is_professor() {
            tracing::warn!(user = %professor.sub, "Active sessions requested without professor role");
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let sessions = self
            .repository
            .sessions
            .list_live_for_professor(professor.user_id, now)
            .await?;

        let mut course_ids: Vec<i64> = sessions.iter().map(|s| s.course_id).collect();
        course_ids.sort_unstable();
        course_ids.dedup();
        let courses: HashMap<_, _> = self
            .repository
            .directory
            .get_courses(&course_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let mut descriptors = Vec::with_capacity(sessions.len());
        for session in &sessions {
            let course = courses.get(&session.course_id).ok_or_else(|| {
                AppError::Internal(format!(
                    "Session {} references missing course {}",
                    session.id, session.course_id
                ))
            })?;
            descriptors.push(SessionDescriptor::new(session, course));
        }
        Ok(descriptors)
    }

    /// Students who redeemed the code of a session the caller owns
    pub async fn get_session_attendees(
        &self,
        session_id: i64,
        professor: &UserClaims,
    ) -> AppResult<Vec<StudentSummary>> {
        let session = self
            .repository
            .sessions
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Attendance session not found with ID: {}", session_id))
            })?;

        if session.professor_id != professor.user_id {
            tracing::warn!(
                professor_id = professor.user_id,
                session_id,
                owner_id = session.professor_id,
                "Attendee list requested for a session owned by another professor"
            );
            return Err(AppError::Forbidden(
                "Professor does not have permission to view attendees for this session".to_string(),
            ));
        }

        let student_ids = self.repository.records.list_attendee_ids(session_id).await?;
        let students = self.repository.directory.get_users(&student_ids).await?;
        Ok(students.into_iter().map(StudentSummary::from).collect())
    }

    /// Distinct days with at least one session since the last reset
    pub async fn get_class_days_count(&self, professor: &UserClaims, course_id: i64) -> AppResult<i64> {
        professor.require_professor()?;
        self.require_course(course_id).await?;

        let reset_at = self
            .repository
            .resets
            .get_reset(professor.user_id, course_id)
            .await?;
        self.repository
            .sessions
            .count_class_days(professor.user_id, course_id, reset_at)
            .await
    }

    pub async fn reset_class_days_count(&self, professor: &UserClaims, course_id: i64) -> AppResult<()> {
        professor.require_professor()?;
        self.require_course(course_id).await?;

        let now = self.clock.now();
        self.repository
            .resets
            .upsert_reset(professor.user_id, course_id, now)
            .await?;
        tracing::info!(professor_id = professor.user_id, course_id, "Reset class days counter");
        Ok(())
    }

    /// Flip expired sessions that still carry the active flag
    pub async fn deactivate_expired_sessions(&self) -> AppResult<u64> {
        let now = self.clock.now();
        let count = self.repository.sessions.deactivate_expired(now).await?;
        if count > 0 {
            tracing::info!(count, "Deactivated expired attendance sessions");
        }
        Ok(count)
    }

    /// Whether the session store answers
    pub async fn check_store(&self) -> AppResult<()> {
        self.repository.directory.ping().await
    }

    async fn require_course(&self, course_id: i64) -> AppResult<()> {
        self.repository
            .directory
            .get_course(course_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Course not found with ID: {}", course_id)))
    }
}
