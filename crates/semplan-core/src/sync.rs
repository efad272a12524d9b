//! Read-modify-write cycles against the record store.
//!
//! Every plan action is fetch -> normalize -> mutate -> commit. There is no
//! transaction around the cycle: with the default policy the later of two
//! concurrent commits wins.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Course, CourseDraft, CourseFieldUpdate, apply_field_update};
use crate::error::PlanError;
use crate::plan::{
    CourseId, CoursePlan, DEFAULT_SEMESTER_COUNT, Normalized, OwnerId, normalize,
    semesters_to_json,
};
use crate::store::{PlanWrite, RecordStore};

/// How a commit treats a plan that changed in the store since it was
/// loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Overwrite unconditionally.
    #[default]
    LastWriterWins,
    /// Fail with [`PlanError::StaleWrite`] when the stored version moved.
    RejectStale,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LastWriterWins => "last_writer_wins",
            Self::RejectStale => "reject_stale",
        };
        f.write_str(s)
    }
}

impl FromStr for ConflictPolicy {
    type Err = ConflictPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last_writer_wins" => Ok(Self::LastWriterWins),
            "reject_stale" => Ok(Self::RejectStale),
            other => Err(ConflictPolicyParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`ConflictPolicy`] string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid conflict policy: {0:?} (expected last_writer_wins or reject_stale)")]
pub struct ConflictPolicyParseError(pub String);

/// Loads, heals and commits plans; reads and edits the catalog.
#[derive(Clone)]
pub struct PlanSynchronizer {
    store: Arc<dyn RecordStore>,
    policy: ConflictPolicy,
}

impl fmt::Debug for PlanSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanSynchronizer")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl PlanSynchronizer {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            policy: ConflictPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Fetch the plan of `owner`, creating it on first access, and return it
    /// in canonical form.
    ///
    /// When the stored semesters were not canonical the normalized array is
    /// written back once. A failed write-back is logged and otherwise
    /// ignored; the canonical plan is still returned.
    pub async fn load(&self, owner: OwnerId) -> Result<CoursePlan, PlanError> {
        let record = match self.store.plan_for_owner(owner).await? {
            Some(record) => record,
            None => {
                let semesters =
                    semesters_to_json(&CoursePlan::empty_semesters(DEFAULT_SEMESTER_COUNT));
                let record = self
                    .store
                    .create_plan(owner, DEFAULT_SEMESTER_COUNT as i32, &semesters)
                    .await?;
                tracing::info!(owner = %owner, plan_id = %record.id, "created course plan");
                record
            }
        };

        let Normalized {
            mut plan,
            stored_semesters,
            report,
        } = normalize(&record);

        if report.changed {
            tracing::info!(
                owner = %owner,
                plan_id = %plan.id,
                legacy_semesters = report.legacy_semesters,
                skipped_entries = report.skipped_entries,
                duplicates_removed = report.duplicates_removed,
                "rewriting stored plan in canonical form"
            );
            match self
                .store
                .rewrite_plan_semesters(plan.id, &semesters_to_json(&stored_semesters))
                .await
            {
                Ok(version) => plan.version = version,
                Err(e) => tracing::warn!(
                    plan_id = %plan.id,
                    error = %e,
                    "failed to persist normalized plan, continuing with in-memory form"
                ),
            }
        }

        Ok(plan)
    }

    /// Persist `plan` by its row id. Returns the plan carrying the new
    /// stored version.
    pub async fn commit(&self, plan: &CoursePlan) -> Result<CoursePlan, PlanError> {
        let violations = plan.invariant_violations();
        if !violations.is_empty() {
            tracing::warn!(
                plan_id = %plan.id,
                ?violations,
                "committing plan with broken invariants"
            );
        }

        let total_semesters = i32::try_from(plan.total_semesters)
            .map_err(|_| PlanError::InvalidSemesterCount(plan.total_semesters))?;
        let write = PlanWrite {
            total_semesters,
            semesters: plan.semesters_json(),
            expected_version: match self.policy {
                ConflictPolicy::LastWriterWins => None,
                ConflictPolicy::RejectStale => Some(plan.version),
            },
        };

        let version = self.store.update_plan(plan.id, &write).await?;
        tracing::debug!(plan_id = %plan.id, version, "committed course plan");

        let mut committed = plan.clone();
        committed.version = version;
        Ok(committed)
    }

    /// The current catalog of `owner`.
    pub async fn reconcile_catalog(&self, owner: OwnerId) -> Result<Catalog, PlanError> {
        let courses = self.store.courses_for_owner(owner).await?;
        Ok(Catalog::new(owner, courses))
    }

    /// Validate `draft` and upsert it by `(owner, code)`.
    pub async fn save_course(
        &self,
        owner: OwnerId,
        draft: &CourseDraft,
    ) -> Result<Course, PlanError> {
        let draft = draft.validated()?;
        let course = self.store.save_course(owner, &draft).await?;
        tracing::info!(owner = %owner, course_id = %course.id, code = %course.code, "saved course");
        Ok(course)
    }

    /// Apply one field edit to `catalog` and persist it. Returns the edited
    /// catalog; `catalog` itself is not changed.
    pub async fn update_course_field(
        &self,
        catalog: &Catalog,
        course_id: &CourseId,
        field: &str,
        value: &str,
    ) -> Result<Catalog, PlanError> {
        let update = CourseFieldUpdate::parse(field, value)?;
        let next = apply_field_update(catalog, course_id, &update)?;
        self.persist_field_update(course_id, &update).await?;
        Ok(next)
    }

    /// Persist an edit that has already been applied in memory.
    pub async fn persist_field_update(
        &self,
        course_id: &CourseId,
        update: &CourseFieldUpdate,
    ) -> Result<(), PlanError> {
        self.store.update_course(course_id, update).await?;
        tracing::debug!(course_id = %course_id, field = %update.field(), "updated course field");
        Ok(())
    }
}
