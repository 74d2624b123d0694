//! Attendance session endpoints (professor side)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        session::{ClassDaysCount, CreateSessionRequest, SessionDescriptor},
        user::StudentSummary,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Open an attendance session and issue its verification code
#[utoipa::path(
    post,
    path = "/attendance/sessions",
    tag = "sessions",
    security(("bearer_auth" = [])),
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionDescriptor),
        (status = 400, description = "Invalid expiry time", body = crate::error::ErrorResponse),
        (status = 403, description = "Not a professor of this course", body = crate::error::ErrorResponse),
        (status = 404, description = "Course not found", body = crate::error::ErrorResponse),
        (status = 409, description = "No unique code could be generated", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateSessionRequest>,
) -> AppResult<(StatusCode, Json<SessionDescriptor>)> {
    let session = state
        .services
        .sessions
        .create_session(&claims, request.course_id, request.expiry_minutes)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Live sessions opened by the caller
#[utoipa::path(
    get,
    path = "/attendance/sessions/active",
    tag = "sessions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active sessions, newest first", body = Vec<SessionDescriptor>)
    )
)]
pub async fn list_active_sessions(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<SessionDescriptor>>> {
    let sessions = state
        .services
        .sessions
        .get_active_sessions_for_professor(&claims)
        .await?;
    Ok(Json(sessions))
}

/// Students who redeemed the session's code
#[utoipa::path(
    get,
    path = "/attendance/sessions/{id}/attendees",
    tag = "sessions",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Attendees ordered by id", body = Vec<StudentSummary>),
        (status = 403, description = "Session owned by another professor", body = crate::error::ErrorResponse),
        (status = 404, description = "Session not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_attendees(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(session_id): Path<i64>,
) -> AppResult<Json<Vec<StudentSummary>>> {
    let attendees = state
        .services
        .sessions
        .get_session_attendees(session_id, &claims)
        .await?;
    Ok(Json(attendees))
}

/// Distinct class days since the last reset
#[utoipa::path(
    get,
    path = "/attendance/sessions/class-days/{course_id}",
    tag = "sessions",
    security(("bearer_auth" = [])),
    params(
        ("course_id" = i64, Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Class days count", body = ClassDaysCount),
        (status = 403, description = "Not a professor", body = crate::error::ErrorResponse),
        (status = 404, description = "Course not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_class_days(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(course_id): Path<i64>,
) -> AppResult<Json<ClassDaysCount>> {
    let count = state
        .services
        .sessions
        .get_class_days_count(&claims, course_id)
        .await?;
    Ok(Json(ClassDaysCount { course_id, count }))
}

/// Restart the class days counter from now
#[utoipa::path(
    post,
    path = "/attendance/sessions/class-days/{course_id}/reset",
    tag = "sessions",
    security(("bearer_auth" = [])),
    params(
        ("course_id" = i64, Path, description = "Course ID")
    ),
    responses(
        (status = 204, description = "Counter reset"),
        (status = 403, description = "Not a professor", body = crate::error::ErrorResponse),
        (status = 404, description = "Course not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn reset_class_days(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(course_id): Path<i64>,
) -> AppResult<StatusCode> {
    state
        .services
        .sessions
        .reset_class_days_count(&claims, course_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
