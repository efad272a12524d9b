//! Database query functions for the `course_plans` table.
//!
//! Writes are keyed by the plan row id. Every write bumps `version`; only
//! [`update_plan_if_version`] checks it.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::CoursePlanRow;

/// Fetch the plan owned by `owner_id`.
pub async fn get_plan_for_owner(pool: &PgPool, owner_id: Uuid) -> Result<Option<CoursePlanRow>> {
    let row = sqlx::query_as::<_, CoursePlanRow>(
        "SELECT * FROM course_plans WHERE owner_id = $1",
    )
    .bind(owner_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch course plan")?;

    Ok(row)
}

/// Fetch a plan by its row id.
pub async fn get_plan(pool: &PgPool, id: Uuid) -> Result<Option<CoursePlanRow>> {
    let row = sqlx::query_as::<_, CoursePlanRow>("SELECT * FROM course_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch course plan")?;

    Ok(row)
}

/// Insert the plan for `owner_id`. If another session created it first,
/// return that row instead.
pub async fn insert_or_get_plan(
    pool: &PgPool,
    owner_id: Uuid,
    total_semesters: i32,
    semesters: &serde_json::Value,
) -> Result<CoursePlanRow> {
    let inserted = sqlx::query_as::<_, CoursePlanRow>(
        "INSERT INTO course_plans (owner_id, total_semesters, semesters) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (owner_id) DO NOTHING \
         RETURNING *",
    )
    .bind(owner_id)
    .bind(total_semesters)
    .bind(semesters)
    .fetch_optional(pool)
    .await
    .context("failed to insert course plan")?;

    match inserted {
        Some(row) => Ok(row),
        None => get_plan_for_owner(pool, owner_id)
            .await?
            .with_context(|| format!("course plan for owner {owner_id} vanished after conflict")),
    }
}

/// Overwrite `total_semesters` and `semesters`. Returns the new version, or
/// `None` when no row has this id.
pub async fn update_plan(
    pool: &PgPool,
    id: Uuid,
    total_semesters: i32,
    semesters: &serde_json::Value,
) -> Result<Option<i64>> {
    let version: Option<i64> = sqlx::query_scalar(
        "UPDATE course_plans \
         SET total_semesters = $1, semesters = $2, version = version + 1, updated_at = now() \
         WHERE id = $3 \
         RETURNING version",
    )
    .bind(total_semesters)
    .bind(semesters)
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to update course plan")?;

    Ok(version)
}

/// Like [`update_plan`], but only when the stored version still equals
/// `expected_version`. Returns `None` on a version mismatch or missing row.
pub async fn update_plan_if_version(
    pool: &PgPool,
    id: Uuid,
    expected_version: i64,
    total_semesters: i32,
    semesters: &serde_json::Value,
) -> Result<Option<i64>> {
    let version: Option<i64> = sqlx::query_scalar(
        "UPDATE course_plans \
         SET total_semesters = $1, semesters = $2, version = version + 1, updated_at = now() \
         WHERE id = $3 AND version = $4 \
         RETURNING version",
    )
    .bind(total_semesters)
    .bind(semesters)
    .bind(id)
    .bind(expected_version)
    .fetch_optional(pool)
    .await
    .context("failed to update course plan")?;

    Ok(version)
}

/// Rewrite only the `semesters` column (format migration write-back).
pub async fn update_plan_semesters(
    pool: &PgPool,
    id: Uuid,
    semesters: &serde_json::Value,
) -> Result<Option<i64>> {
    let version: Option<i64> = sqlx::query_scalar(
        "UPDATE course_plans \
         SET semesters = $1, version = version + 1, updated_at = now() \
         WHERE id = $2 \
         RETURNING version",
    )
    .bind(semesters)
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("failed to rewrite course plan semesters")?;

    Ok(version)
}
