//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{attendance, health, sessions};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance API",
        version = "1.0.0",
        description = "College attendance sessions and verification codes",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Sessions
        sessions::create_session,
        sessions::list_active_sessions,
        sessions::list_attendees,
        sessions::get_class_days,
        sessions::reset_class_days,
        // Attendance
        attendance::record_attendance,
        attendance::my_attendance,
        attendance::present_today,
        attendance::course_day_records,
        attendance::course_day_attendees,
    ),
    components(
        schemas(
            // Sessions
            crate::models::session::CreateSessionRequest,
            crate::models::session::SessionDescriptor,
            crate::models::session::ClassDaysCount,
            crate::models::user::StudentSummary,
            crate::models::user::Role,
            // Attendance
            crate::models::attendance::RecordAttendanceRequest,
            crate::models::attendance::AttendanceReceipt,
            crate::models::attendance::PresenceResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Attendance sessions opened by professors"),
        (name = "attendance", description = "Verification code redemption and attendance records")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
