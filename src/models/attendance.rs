//! Attendance record (ledger) model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{course::Course, user::User};

/// Attendance record from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    /// Session whose code was redeemed
    pub session_id: i64,
    pub timestamp: DateTime<Utc>,
    pub attendance_day: NaiveDate,
    pub verified: bool,
}

/// Insert payload for a redemption
#[derive(Debug, Clone)]
pub struct NewAttendanceRecord {
    pub student_id: i64,
    pub course_id: i64,
    pub session_id: i64,
    pub timestamp: DateTime<Utc>,
    pub attendance_day: NaiveDate,
}

/// Record attendance request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RecordAttendanceRequest {
    pub course_id: i64,
    #[validate(length(min = 1, max = 32, message = "Verification code is required"))]
    pub verification_code: String,
}

/// Receipt returned after a successful redemption
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceReceipt {
    pub id: i64,
    pub student_name: String,
    /// Registrar student number, "N/A" when unknown
    pub student_id: String,
    pub course_code: String,
    pub course_name: String,
    pub timestamp: DateTime<Utc>,
    pub verified: bool,
}

impl AttendanceReceipt {
    pub fn new(record: &AttendanceRecord, student: &User, course: &Course) -> Self {
        Self {
            id: record.id,
            student_name: student.full_name.clone(),
            student_id: student
                .student_id
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            course_code: course.course_code.clone(),
            course_name: course.course_name.clone(),
            timestamp: record.timestamp,
            verified: record.verified,
        }
    }
}

/// Presence check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PresenceResponse {
    pub course_id: i64,
    pub present: bool,
}
