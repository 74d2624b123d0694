//! Course model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Course as needed by attendance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Course {
    pub id: i64,
    /// Catalogue code, e.g. "CS101"
    pub course_code: String,
    pub course_name: String,
}
