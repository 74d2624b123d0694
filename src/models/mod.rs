//! Data models for the attendance server

pub mod attendance;
pub mod course;
pub mod session;
pub mod user;

// Re-export commonly used types
pub use attendance::{AttendanceReceipt, AttendanceRecord, NewAttendanceRecord};
pub use course::Course;
pub use session::{AttendanceSession, NewSession, SessionDescriptor};
pub use user::{Role, StudentSummary, User, UserClaims};
