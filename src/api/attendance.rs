//! Attendance endpoints: redemption and history for students, per-day views
//! for professors

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;

use crate::{
    error::AppResult,
    models::{
        attendance::{AttendanceReceipt, PresenceResponse, RecordAttendanceRequest},
        user::StudentSummary,
    },
    AppState,
};

use super::{validate_request, AuthenticatedUser};

/// Redeem a verification code
#[utoipa::path(
    post,
    path = "/attendance/records",
    tag = "attendance",
    security(("bearer_auth" = [])),
    request_body = RecordAttendanceRequest,
    responses(
        (status = 201, description = "Attendance recorded", body = AttendanceReceipt),
        (status = 404, description = "Course not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Not enrolled, already recorded today, or invalid code", body = crate::error::ErrorResponse),
        (status = 429, description = "Too many invalid codes", body = crate::error::ErrorResponse)
    )
)]
pub async fn record_attendance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<RecordAttendanceRequest>,
) -> AppResult<(StatusCode, Json<AttendanceReceipt>)> {
    validate_request(&request)?;

    let receipt = state
        .services
        .attendance
        .record_attendance(&claims, request.course_id, &request.verification_code)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// The caller's attendance history for a course
#[utoipa::path(
    get,
    path = "/attendance/courses/{course_id}/records",
    tag = "attendance",
    security(("bearer_auth" = [])),
    params(
        ("course_id" = i64, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Receipts, oldest first", body = Vec<AttendanceReceipt>),
        (status = 404, description = "Course not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn my_attendance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(course_id): Path<i64>,
) -> AppResult<Json<Vec<AttendanceReceipt>>> {
    let receipts = state
        .services
        .attendance
        .get_my_attendance(&claims, course_id)
        .await?;
    Ok(Json(receipts))
}

/// Whether the caller is already marked present today
#[utoipa::path(
    get,
    path = "/attendance/courses/{course_id}/today",
    tag = "attendance",
    security(("bearer_auth" = [])),
    params(
        ("course_id" = i64, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Presence for today", body = PresenceResponse),
        (status = 404, description = "Course not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn present_today(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(course_id): Path<i64>,
) -> AppResult<Json<PresenceResponse>> {
    let present = state
        .services
        .attendance
        .is_present_today(&claims, course_id)
        .await?;
    Ok(Json(PresenceResponse { course_id, present }))
}

/// Every record of a course on one calendar day
#[utoipa::path(
    get,
    path = "/attendance/courses/{course_id}/days/{date}",
    tag = "attendance",
    security(("bearer_auth" = [])),
    params(
        ("course_id" = i64, Path, description = "Course ID"),
        ("date" = NaiveDate, Path, description = "Calendar day (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "Receipts, oldest first", body = Vec<AttendanceReceipt>),
        (status = 403, description = "Not a professor of this course", body = crate::error::ErrorResponse),
        (status = 404, description = "Course not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn course_day_records(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((course_id, date)): Path<(i64, NaiveDate)>,
) -> AppResult<Json<Vec<AttendanceReceipt>>> {
    let receipts = state
        .services
        .attendance
        .get_course_attendance_for_date(&claims, course_id, date)
        .await?;
    Ok(Json(receipts))
}

/// Students marked present for a course on one calendar day
#[utoipa::path(
    get,
    path = "/attendance/courses/{course_id}/days/{date}/attendees",
    tag = "attendance",
    security(("bearer_auth" = [])),
    params(
        ("course_id" = i64, Path, description = "Course ID"),
        ("date" = NaiveDate, Path, description = "Calendar day (YYYY-MM-DD)")
    ),
    responses(
        (status = 200, description = "Attendees ordered by id", body = Vec<StudentSummary>),
        (status = 403, description = "Not a professor of this course", body = crate::error::ErrorResponse),
        (status = 404, description = "Course not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn course_day_attendees(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((course_id, date)): Path<(i64, NaiveDate)>,
) -> AppResult<Json<Vec<StudentSummary>>> {
    let attendees = state
        .services
        .attendance
        .get_attendees_for_course_on_date(&claims, course_id, date)
        .await?;
    Ok(Json(attendees))
}
