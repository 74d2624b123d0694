//! Attendance session model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::course::Course;

/// Attendance session from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AttendanceSession {
    pub id: i64,
    pub course_id: i64,
    /// Professor who opened the session
    pub professor_id: i64,
    pub verification_code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Calendar day the session counts towards
    pub class_day: NaiveDate,
    pub active: bool,
}

impl AttendanceSession {
    /// Active flag and expiry are independent signals, both must hold.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at > now
    }

    /// Redemption predicate for a submitted code
    pub fn accepts(&self, course_id: i64, code: &str, now: DateTime<Utc>) -> bool {
        self.course_id == course_id && self.verification_code == code && self.is_live_at(now)
    }
}

/// Insert payload for a new session
#[derive(Debug, Clone)]
pub struct NewSession {
    pub course_id: i64,
    pub professor_id: i64,
    pub verification_code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub class_day: NaiveDate,
}

/// Session as returned to its professor
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionDescriptor {
    pub session_id: i64,
    pub course_id: i64,
    pub course_code: String,
    pub course_name: String,
    /// Code students type in to be marked present
    pub verification_code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub active: bool,
}

impl SessionDescriptor {
    pub fn new(session: &AttendanceSession, course: &Course) -> Self {
        Self {
            session_id: session.id,
            course_id: session.course_id,
            course_code: course.course_code.clone(),
            course_name: course.course_name.clone(),
            verification_code: session.verification_code.clone(),
            created_at: session.created_at,
            expires_at: session.expires_at,
            active: session.active,
        }
    }
}

/// Create session request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub course_id: i64,
    /// Minutes until the code stops being accepted. Bounds are enforced by
    /// the session service after the role and course checks.
    pub expiry_minutes: i64,
}

/// Class days counter response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClassDaysCount {
    pub course_id: i64,
    pub count: i64,
}
