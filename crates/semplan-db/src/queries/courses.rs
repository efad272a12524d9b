//! Database query functions for the `courses` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::CourseRow;

/// Column values for inserting or overwriting a course.
#[derive(Debug, Clone)]
pub struct NewCourse<'a> {
    pub owner_id: Uuid,
    pub code: &'a str,
    pub name: &'a str,
    pub credits: i32,
    pub is_required: bool,
    pub prerequisites: &'a [String],
    pub semester: Option<i32>,
}

/// List every course owned by `owner_id`, ordered by code.
pub async fn list_courses_for_owner(pool: &PgPool, owner_id: Uuid) -> Result<Vec<CourseRow>> {
    let rows = sqlx::query_as::<_, CourseRow>(
        "SELECT * FROM courses WHERE owner_id = $1 ORDER BY code",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
    .context("failed to list courses")?;

    Ok(rows)
}

/// Insert a course, or overwrite the existing course with the same
/// `(owner_id, code)`. Grade is left untouched on overwrite.
///
/// The conflict target is the table's UNIQUE constraint, so two concurrent
/// saves of the same code converge on one row.
pub async fn upsert_course(pool: &PgPool, new: &NewCourse<'_>) -> Result<CourseRow> {
    let row = sqlx::query_as::<_, CourseRow>(
        "INSERT INTO courses (owner_id, code, name, credits, is_required, prerequisites, semester) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (owner_id, code) DO UPDATE SET \
             name = EXCLUDED.name, \
             credits = EXCLUDED.credits, \
             is_required = EXCLUDED.is_required, \
             prerequisites = EXCLUDED.prerequisites, \
             semester = EXCLUDED.semester, \
             updated_at = now() \
         RETURNING *",
    )
    .bind(new.owner_id)
    .bind(new.code)
    .bind(new.name)
    .bind(new.credits)
    .bind(new.is_required)
    .bind(new.prerequisites)
    .bind(new.semester)
    .fetch_one(pool)
    .await
    .with_context(|| format!("failed to save course {:?}", new.code))?;

    Ok(row)
}

/// Set or clear the grade of a course. Returns `false` when no course has
/// this id.
pub async fn update_course_grade(pool: &PgPool, id: Uuid, grade: Option<&str>) -> Result<bool> {
    let result = sqlx::query("UPDATE courses SET grade = $1, updated_at = now() WHERE id = $2")
        .bind(grade)
        .bind(id)
        .execute(pool)
        .await
        .context("failed to update course grade")?;

    Ok(result.rows_affected() > 0)
}

/// Set the required flag of a course. Returns `false` when no course has
/// this id.
pub async fn update_course_required(pool: &PgPool, id: Uuid, is_required: bool) -> Result<bool> {
    let result =
        sqlx::query("UPDATE courses SET is_required = $1, updated_at = now() WHERE id = $2")
            .bind(is_required)
            .bind(id)
            .execute(pool)
            .await
            .context("failed to update course required flag")?;

    Ok(result.rows_affected() > 0)
}
