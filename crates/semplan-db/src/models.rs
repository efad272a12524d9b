use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user identity issued by `semplan login`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A row of the `courses` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CourseRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub code: String,
    pub name: String,
    pub credits: i32,
    pub is_required: bool,
    pub prerequisites: Vec<String>,
    pub grade: Option<String>,
    /// Semester hint recorded by the browse view when the course was saved.
    pub semester: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row of the `course_plans` table.
///
/// `semesters` is kept as raw JSON: rows written by older clients embed full
/// course objects, so decoding into a typed shape happens above this layer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CoursePlanRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub total_semesters: i32,
    pub semesters: serde_json::Value,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
