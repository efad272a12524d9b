//! Ports to the record store and the authentication provider.
//!
//! The store is document-like: one plan record per owner whose `semesters`
//! column is raw JSON (it may still be in the legacy shape), and one catalog
//! record per course. [`MemoryStore`] backs tests and offline use;
//! [`PgStore`] persists to PostgreSQL through `semplan-db`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Course, CourseDraft, CourseFieldUpdate};
use crate::plan::{CourseId, OwnerId, PlanId};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors raised by store adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("plan {plan_id} is no longer at version {expected}")]
    VersionConflict { plan_id: PlanId, expected: i64 },

    #[error("malformed record: {0}")]
    Decode(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::Unavailable(format!("{err:#}"))
    }
}

/// A stored plan row, semesters still undecoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRecord {
    pub id: PlanId,
    pub owner_id: OwnerId,
    pub total_semesters: i32,
    pub semesters: serde_json::Value,
    pub version: i64,
}

/// A full write of a plan row.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanWrite {
    pub total_semesters: i32,
    pub semesters: serde_json::Value,
    /// When set, the write only applies if the stored version matches.
    pub expected_version: Option<i64>,
}

/// Durable storage partitioned by owner.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The plan row of `owner`, if one exists.
    async fn plan_for_owner(&self, owner: OwnerId) -> Result<Option<PlanRecord>, StoreError>;

    /// Create the plan row of `owner`. If it already exists (another session
    /// won the race) the existing row is returned unchanged.
    async fn create_plan(
        &self,
        owner: OwnerId,
        total_semesters: i32,
        semesters: &serde_json::Value,
    ) -> Result<PlanRecord, StoreError>;

    /// Overwrite a plan row by id. Returns the new version.
    async fn update_plan(&self, id: PlanId, write: &PlanWrite) -> Result<i64, StoreError>;

    /// Rewrite only the semesters of a plan row (format migration).
    async fn rewrite_plan_semesters(
        &self,
        id: PlanId,
        semesters: &serde_json::Value,
    ) -> Result<i64, StoreError>;

    /// Every catalog course of `owner`.
    async fn courses_for_owner(&self, owner: OwnerId) -> Result<Vec<Course>, StoreError>;

    /// Insert the draft, or overwrite the course with the same code.
    /// Grades survive the overwrite.
    async fn save_course(&self, owner: OwnerId, draft: &CourseDraft) -> Result<Course, StoreError>;

    /// Persist one field edit of a course.
    async fn update_course(
        &self,
        id: &CourseId,
        update: &CourseFieldUpdate,
    ) -> Result<(), StoreError>;
}

/// Issues the identity of the current session.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// `None` when nobody is signed in.
    async fn current_user(&self) -> Result<Option<OwnerId>, StoreError>;
}

/// Identity fixed when the session starts, e.g. read from a config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionAuth {
    user: Option<OwnerId>,
}

impl SessionAuth {
    pub fn signed_in(user: OwnerId) -> Self {
        Self { user: Some(user) }
    }

    pub fn signed_out() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl AuthProvider for SessionAuth {
    async fn current_user(&self) -> Result<Option<OwnerId>, StoreError> {
        Ok(self.user)
    }
}

// Both ports are used behind `Arc<dyn _>` by the CLI.
const _: () = {
    fn _assert_object_safe(_: &dyn RecordStore, _: &dyn AuthProvider) {}
};
