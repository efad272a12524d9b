//! [`RecordStore`] backed by PostgreSQL through `semplan-db`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use semplan_db::models::{CoursePlanRow, CourseRow};
use semplan_db::queries::{course_plans, courses};

use super::{PlanRecord, PlanWrite, RecordStore, StoreError};
use crate::catalog::{Course, CourseDraft, CourseFieldUpdate};
use crate::plan::{CourseId, OwnerId, PlanId};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn plan_record(row: CoursePlanRow) -> PlanRecord {
    PlanRecord {
        id: PlanId(row.id),
        owner_id: OwnerId(row.owner_id),
        total_semesters: row.total_semesters,
        semesters: row.semesters,
        version: row.version,
    }
}

fn course(row: CourseRow) -> Result<Course, StoreError> {
    let credits = u32::try_from(row.credits)
        .map_err(|_| StoreError::Decode(format!("course {} has credits {}", row.id, row.credits)))?;
    let semester = row
        .semester
        .map(u32::try_from)
        .transpose()
        .map_err(|_| StoreError::Decode(format!("course {} has a negative semester", row.id)))?;

    Ok(Course {
        id: CourseId::from(row.id),
        owner_id: OwnerId(row.owner_id),
        code: row.code,
        name: row.name,
        credits,
        is_required: row.is_required,
        prerequisites: row.prerequisites,
        grade: row.grade,
        semester,
    })
}

fn to_i32(value: u32, what: &str) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Decode(format!("{what} {value} is out of range")))
}

#[async_trait]
impl RecordStore for PgStore {
    async fn plan_for_owner(&self, owner: OwnerId) -> Result<Option<PlanRecord>, StoreError> {
        let row = course_plans::get_plan_for_owner(&self.pool, owner.0).await?;
        Ok(row.map(plan_record))
    }

    async fn create_plan(
        &self,
        owner: OwnerId,
        total_semesters: i32,
        semesters: &serde_json::Value,
    ) -> Result<PlanRecord, StoreError> {
        let row =
            course_plans::insert_or_get_plan(&self.pool, owner.0, total_semesters, semesters)
                .await?;
        Ok(plan_record(row))
    }

    async fn update_plan(&self, id: PlanId, write: &PlanWrite) -> Result<i64, StoreError> {
        let updated = match write.expected_version {
            None => {
                course_plans::update_plan(&self.pool, id.0, write.total_semesters, &write.semesters)
                    .await?
            }
            Some(expected) => {
                course_plans::update_plan_if_version(
                    &self.pool,
                    id.0,
                    expected,
                    write.total_semesters,
                    &write.semesters,
                )
                .await?
            }
        };

        match (updated, write.expected_version) {
            (Some(version), _) => Ok(version),
            (None, None) => Err(StoreError::NotFound(format!("plan {id}"))),
            (None, Some(expected)) => {
                // Tell a missing row apart from a version mismatch.
                match course_plans::get_plan(&self.pool, id.0).await? {
                    None => Err(StoreError::NotFound(format!("plan {id}"))),
                    Some(row) => {
                        debug!(plan_id = %id, expected, stored = row.version, "stale plan write");
                        Err(StoreError::VersionConflict {
                            plan_id: id,
                            expected,
                        })
                    }
                }
            }
        }
    }

    async fn rewrite_plan_semesters(
        &self,
        id: PlanId,
        semesters: &serde_json::Value,
    ) -> Result<i64, StoreError> {
        course_plans::update_plan_semesters(&self.pool, id.0, semesters)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("plan {id}")))
    }

    async fn courses_for_owner(&self, owner: OwnerId) -> Result<Vec<Course>, StoreError> {
        courses::list_courses_for_owner(&self.pool, owner.0)
            .await?
            .into_iter()
            .map(course)
            .collect()
    }

    async fn save_course(&self, owner: OwnerId, draft: &CourseDraft) -> Result<Course, StoreError> {
        let new = courses::NewCourse {
            owner_id: owner.0,
            code: &draft.code,
            name: &draft.name,
            credits: to_i32(draft.credits, "credits")?,
            is_required: draft.is_required,
            prerequisites: &draft.prerequisites,
            semester: draft.semester.map(|s| to_i32(s, "semester")).transpose()?,
        };
        let row = courses::upsert_course(&self.pool, &new).await?;
        course(row)
    }

    async fn update_course(
        &self,
        id: &CourseId,
        update: &CourseFieldUpdate,
    ) -> Result<(), StoreError> {
        let uuid = id
            .as_uuid()
            .ok_or_else(|| StoreError::NotFound(format!("course {id}")))?;

        let found = match update {
            CourseFieldUpdate::Grade(grade) => {
                courses::update_course_grade(&self.pool, uuid, grade.as_deref()).await?
            }
            CourseFieldUpdate::IsRequired(required) => {
                courses::update_course_required(&self.pool, uuid, *required).await?
            }
        };

        if found {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("course {id}")))
        }
    }
}
