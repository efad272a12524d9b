//! In-process record store.
//!
//! Behaves like the PostgreSQL store (one plan per owner, unique course
//! codes per owner, version bump on every plan write) and can be told to
//! fail upcoming reads or writes.

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{PlanRecord, PlanWrite, RecordStore, StoreError};
use crate::catalog::{Course, CourseDraft, CourseFieldUpdate};
use crate::plan::{CourseId, OwnerId, PlanId};

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    plans: Vec<PlanRecord>,
    courses: Vec<Course>,
    failing_reads: usize,
    failing_writes: usize,
    writes: usize,
}

impl State {
    fn begin_read(&mut self) -> Result<(), StoreError> {
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Err(StoreError::Unavailable("simulated read failure".into()));
        }
        Ok(())
    }

    fn begin_write(&mut self) -> Result<(), StoreError> {
        if self.failing_writes > 0 {
            self.failing_writes -= 1;
            return Err(StoreError::Unavailable("simulated write failure".into()));
        }
        self.writes += 1;
        Ok(())
    }

    fn plan_mut(&mut self, id: PlanId) -> Result<&mut PlanRecord, StoreError> {
        self.plans
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("plan {id}")))
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a plan record as-is, replacing any plan of the same owner.
    /// Does not count as a write.
    pub async fn put_plan_record(&self, record: PlanRecord) {
        let mut state = self.state.lock().await;
        state.plans.retain(|p| p.owner_id != record.owner_id);
        state.plans.push(record);
    }

    /// Store a catalog course as-is. Does not count as a write.
    pub async fn put_course(&self, course: Course) {
        let mut state = self.state.lock().await;
        state.courses.retain(|c| c.id != course.id);
        state.courses.push(course);
    }

    /// The raw plan record of `owner`, bypassing failure injection.
    pub async fn plan_record(&self, owner: OwnerId) -> Option<PlanRecord> {
        let state = self.state.lock().await;
        state.plans.iter().find(|p| p.owner_id == owner).cloned()
    }

    /// Make the next `count` reads fail with [`StoreError::Unavailable`].
    pub async fn fail_next_reads(&self, count: usize) {
        self.state.lock().await.failing_reads = count;
    }

    /// Make the next `count` writes fail with [`StoreError::Unavailable`].
    pub async fn fail_next_writes(&self, count: usize) {
        self.state.lock().await.failing_writes = count;
    }

    /// Successful writes so far.
    pub async fn write_count(&self) -> usize {
        self.state.lock().await.writes
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn plan_for_owner(&self, owner: OwnerId) -> Result<Option<PlanRecord>, StoreError> {
        let mut state = self.state.lock().await;
        state.begin_read()?;
        Ok(state.plans.iter().find(|p| p.owner_id == owner).cloned())
    }

    async fn create_plan(
        &self,
        owner: OwnerId,
        total_semesters: i32,
        semesters: &serde_json::Value,
    ) -> Result<PlanRecord, StoreError> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.plans.iter().find(|p| p.owner_id == owner) {
            return Ok(existing.clone());
        }
        state.begin_write()?;

        let record = PlanRecord {
            id: PlanId(Uuid::new_v4()),
            owner_id: owner,
            total_semesters,
            semesters: semesters.clone(),
            version: 1,
        };
        state.plans.push(record.clone());
        Ok(record)
    }

    async fn update_plan(&self, id: PlanId, write: &PlanWrite) -> Result<i64, StoreError> {
        let mut state = self.state.lock().await;
        state.begin_write()?;

        let record = state.plan_mut(id)?;
        if let Some(expected) = write.expected_version {
            if record.version != expected {
                return Err(StoreError::VersionConflict {
                    plan_id: id,
                    expected,
                });
            }
        }
        record.total_semesters = write.total_semesters;
        record.semesters = write.semesters.clone();
        record.version += 1;
        Ok(record.version)
    }

    async fn rewrite_plan_semesters(
        &self,
        id: PlanId,
        semesters: &serde_json::Value,
    ) -> Result<i64, StoreError> {
        let mut state = self.state.lock().await;
        state.begin_write()?;

        let record = state.plan_mut(id)?;
        record.semesters = semesters.clone();
        record.version += 1;
        Ok(record.version)
    }

    async fn courses_for_owner(&self, owner: OwnerId) -> Result<Vec<Course>, StoreError> {
        let mut state = self.state.lock().await;
        state.begin_read()?;

        let mut courses: Vec<Course> = state
            .courses
            .iter()
            .filter(|c| c.owner_id == owner)
            .cloned()
            .collect();
        courses.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(courses)
    }

    async fn save_course(&self, owner: OwnerId, draft: &CourseDraft) -> Result<Course, StoreError> {
        let mut state = self.state.lock().await;
        state.begin_write()?;

        if let Some(existing) = state
            .courses
            .iter_mut()
            .find(|c| c.owner_id == owner && c.code == draft.code)
        {
            existing.name = draft.name.clone();
            existing.credits = draft.credits;
            existing.is_required = draft.is_required;
            existing.prerequisites = draft.prerequisites.clone();
            existing.semester = draft.semester;
            return Ok(existing.clone());
        }

        let course = Course {
            id: CourseId::from(Uuid::new_v4()),
            owner_id: owner,
            code: draft.code.clone(),
            name: draft.name.clone(),
            credits: draft.credits,
            is_required: draft.is_required,
            prerequisites: draft.prerequisites.clone(),
            grade: None,
            semester: draft.semester,
        };
        state.courses.push(course.clone());
        Ok(course)
    }

    async fn update_course(
        &self,
        id: &CourseId,
        update: &CourseFieldUpdate,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.begin_write()?;

        let course = state
            .courses
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("course {id}")))?;
        update.apply(course);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn owner() -> OwnerId {
        OwnerId(Uuid::new_v4())
    }

    #[tokio::test]
    async fn create_plan_is_idempotent_per_owner() {
        let store = MemoryStore::new();
        let owner = owner();

        let first = store.create_plan(owner, 8, &json!([])).await.unwrap();
        let second = store.create_plan(owner, 4, &json!([{"id": 1}])).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.write_count().await, 1);
    }

    #[tokio::test]
    async fn update_bumps_version_and_checks_expected() {
        let store = MemoryStore::new();
        let plan = store.create_plan(owner(), 8, &json!([])).await.unwrap();

        let write = PlanWrite {
            total_semesters: 4,
            semesters: json!([]),
            expected_version: None,
        };
        assert_eq!(store.update_plan(plan.id, &write).await.unwrap(), 2);

        let stale = PlanWrite {
            expected_version: Some(1),
            ..write
        };
        assert_matches!(
            store.update_plan(plan.id, &stale).await,
            Err(StoreError::VersionConflict { expected: 1, .. })
        );
    }

    #[tokio::test]
    async fn update_of_unknown_plan_is_not_found() {
        let store = MemoryStore::new();
        let write = PlanWrite {
            total_semesters: 8,
            semesters: json!([]),
            expected_version: None,
        };
        assert_matches!(
            store.update_plan(PlanId(Uuid::new_v4()), &write).await,
            Err(StoreError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn save_course_upserts_by_code_and_keeps_grade() {
        let store = MemoryStore::new();
        let owner = owner();

        let first = store
            .save_course(owner, &CourseDraft::new("CS101", "Intro", 3))
            .await
            .unwrap();
        store
            .update_course(&first.id, &CourseFieldUpdate::Grade(Some("A".into())))
            .await
            .unwrap();
        let second = store
            .save_course(owner, &CourseDraft::new("CS101", "Intro to CS", 4))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.credits, 4);
        assert_eq!(second.grade.as_deref(), Some("A"));
        assert_eq!(store.courses_for_owner(owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn courses_are_partitioned_by_owner() {
        let store = MemoryStore::new();
        let (alice, bob) = (owner(), owner());
        store
            .save_course(alice, &CourseDraft::new("CS101", "Intro", 3))
            .await
            .unwrap();
        store
            .save_course(bob, &CourseDraft::new("CS101", "Intro", 3))
            .await
            .unwrap();

        assert_eq!(store.courses_for_owner(alice).await.unwrap().len(), 1);
        assert_eq!(store.courses_for_owner(bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let store = MemoryStore::new();
        let owner = owner();
        store.fail_next_reads(1).await;
        store.fail_next_writes(1).await;

        assert_matches!(store.plan_for_owner(owner).await, Err(StoreError::Unavailable(_)));
        assert_matches!(store.plan_for_owner(owner).await, Ok(None));
        assert_matches!(
            store.create_plan(owner, 8, &json!([])).await,
            Err(StoreError::Unavailable(_))
        );
        assert!(store.create_plan(owner, 8, &json!([])).await.is_ok());
    }
}
