//! Attendance recording service

use std::{collections::HashMap, sync::Arc};

use chrono::{FixedOffset, NaiveDate};

use crate::{
    clock::{calendar_day, Clock},
    config::AttendanceConfig,
    error::{AppError, AppResult},
    models::{
        attendance::{AttendanceReceipt, NewAttendanceRecord},
        course::Course,
        user::{StudentSummary, User, UserClaims},
    },
    repository::Repository,
    services::{attempts::AttemptGuard, sessions::SessionService},
};

const ALREADY_RECORDED: &str = "Attendance already recorded for this course today";

#[derive(Clone)]
pub struct AttendanceService {
    repository: Repository,
    sessions: SessionService,
    guard: AttemptGuard,
    day_offset: FixedOffset,
    clock: Arc<dyn Clock>,
}

impl AttendanceService {
    pub fn new(
        repository: Repository,
        sessions: SessionService,
        guard: AttemptGuard,
        config: &AttendanceConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            sessions,
            guard,
            day_offset: config.day_offset(),
            clock,
        }
    }

    /// Redeem a verification code for the calling student
    pub async fn record_attendance(
        &self,
        student: &UserClaims,
        course_id: i64,
        code: &str,
    ) -> AppResult<AttendanceReceipt> {
        // Every check below is evaluated against this single instant
        let now = self.clock.now();
        let today = calendar_day(now, self.day_offset);

        let course = self.require_course(course_id).await?;

        if !self
            .repository
            .directory
            .is_enrolled(student.user_id, course_id)
            .await?
        {
            return Err(AppError::InvalidState(
                "User is not enrolled in this course".to_string(),
            ));
        }

        if self
            .repository
            .records
            .find_for_day(student.user_id, course_id, today)
            .await?
            .is_some()
        {
            return Err(AppError::InvalidState(ALREADY_RECORDED.to_string()));
        }

        self.guard.ensure_allowed(student.user_id, course_id).await?;
        self.guard.acquire(student.user_id, course_id).await?;

        let session = match self.sessions.find_valid_session(course_id, code, now).await? {
            Some(session) => session,
            None => {
                tracing::info!(
                    student_id = student.user_id,
                    course_id,
                    "Rejected invalid or expired verification code"
                );
                return Err(AppError::InvalidState(
                    "Invalid or expired verification code for this course".to_string(),
                ));
            }
        };

        let user = self.require_user(student.user_id).await?;

        let new_record = NewAttendanceRecord {
            student_id: student.user_id,
            course_id,
            session_id: session.id,
            timestamp: now,
            attendance_day: today,
        };
        let record = self
            .repository
            .records
            .insert(&new_record)
            .await?
            .ok_or_else(|| {
                tracing::debug!(student_id = student.user_id, course_id, "Concurrent redemption already stored");
                AppError::InvalidState(ALREADY_RECORDED.to_string())
            })?;

        // The record is committed, nothing below may fail the request
        if let Err(e) = self.guard.clear(student.user_id, course_id).await {
            tracing::warn!(
                student_id = student.user_id,
                course_id,
                "Failed to clear verification code attempts: {}",
                e
            );
        }

        tracing::info!(
            record_id = record.id,
            session_id = session.id,
            student_id = student.user_id,
            course = %course.course_code,
            "Recorded attendance"
        );
        Ok(AttendanceReceipt::new(&record, &user, &course))
    }

    /// The caller's own attendance history for a course, oldest first
    pub async fn get_my_attendance(
        &self,
        student: &UserClaims,
        course_id: i64,
    ) -> AppResult<Vec<AttendanceReceipt>> {
        let course = self.require_course(course_id).await?;
        let records = self
            .repository
            .records
            .list_for_student(student.user_id, course_id)
            .await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let user = self.require_user(student.user_id).await?;
        Ok(records
            .iter()
            .map(|record| AttendanceReceipt::new(record, &user, &course))
            .collect())
    }

    pub async fn is_present_today(&self, student: &UserClaims, course_id: i64) -> AppResult<bool> {
        let today = calendar_day(self.clock.now(), self.day_offset);
        self.require_course(course_id).await?;
        let record = self
            .repository
            .records
            .find_for_day(student.user_id, course_id, today)
            .await?;
        Ok(record.is_some())
    }

    /// Every record of a course on one calendar day, oldest first
    pub async fn get_course_attendance_for_date(
        &self,
        professor: &UserClaims,
        course_id: i64,
        date: NaiveDate,
    ) -> AppResult<Vec<AttendanceReceipt>> {
        let course = self.require_teaching(professor, course_id).await?;
        let records = self.repository.records.list_for_course_day(course_id, date).await?;

        let mut student_ids: Vec<i64> = records.iter().map(|r| r.student_id).collect();
        student_ids.sort_unstable();
        student_ids.dedup();
        let students: HashMap<_, _> = self
            .repository
            .directory
            .get_users(&student_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        records
            .iter()
            .map(|record| {
                let student = students.get(&record.student_id).ok_or_else(|| {
                    AppError::Internal(format!(
                        "Attendance record {} references missing user {}",
                        record.id, record.student_id
                    ))
                })?;
                Ok(AttendanceReceipt::new(record, student, &course))
            })
            .collect()
    }

    /// Distinct students with a verified record for a course on one day
    pub async fn get_attendees_for_course_on_date(
        &self,
        professor: &UserClaims,
        course_id: i64,
        date: NaiveDate,
    ) -> AppResult<Vec<StudentSummary>> {
        self.require_teaching(professor, course_id).await?;
        let records = self.repository.records.list_for_course_day(course_id, date).await?;

        let mut student_ids: Vec<i64> = records
            .iter()
            .filter(|r| r.verified)
            .map(|r| r.student_id)
            .collect();
        student_ids.sort_unstable();
        student_ids.dedup();

        let students = self.repository.directory.get_users(&student_ids).await?;
        Ok(students.into_iter().map(StudentSummary::from).collect())
    }

    async fn require_teaching(&self, professor: &UserClaims, course_id: i64) -> AppResult<Course> {
        professor.require_professor()?;
        let course = self.require_course(course_id).await?;
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
        Ok(course)
    }

    async fn require_course(&self, course_id: i64) -> AppResult<Course> {
        self.repository
            .directory
            .get_course(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Course not found with ID: {}", course_id)))
    }

    async fn require_user(&self, user_id: i64) -> AppResult<User> {
        self.repository
            .directory
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found with ID: {}", user_id)))
    }
}
