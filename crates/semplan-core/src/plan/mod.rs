//! Canonical course plan: semesters holding ordered course-id lists.

pub mod mutate;
pub mod normalize;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use mutate::{
    DestructiveResize, ResizeOutcome, add_course, force_resize_semesters, move_course,
    remove_course, resize_semesters,
};
pub use normalize::{NormalizeReport, Normalized, normalize, normalize_semesters};

/// Semester count of a freshly created plan.
pub const DEFAULT_SEMESTER_COUNT: u32 = 8;

/// Semester counts offered by the plan view. The mutator accepts any count
/// in `1..=MAX_SEMESTER_COUNT`.
pub const CANONICAL_SEMESTER_COUNTS: [u32; 5] = [4, 6, 8, 10, 12];

/// Largest plan the mutator builds. Stored semester ids above it are
/// unreadable.
pub const MAX_SEMESTER_COUNT: u32 = 24;

/// One-based semester number.
pub type SemesterId = u32;

/// Identity of the user owning a catalog and a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub Uuid);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Row id of a stored plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub Uuid);

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Reference from a semester to a catalog course.
///
/// Kept as a string: stored plans may reference ids that are not UUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(String);

impl CourseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id as a UUID, when it is one.
    pub fn as_uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.0).ok()
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for CourseId {
    fn from(id: Uuid) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for CourseId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for CourseId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A semester in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semester {
    pub id: SemesterId,
    #[serde(rename = "courseIds")]
    pub course_ids: Vec<CourseId>,
}

impl Semester {
    pub fn empty(id: SemesterId) -> Self {
        Self {
            id,
            course_ids: Vec::new(),
        }
    }

    pub fn contains(&self, course_id: &CourseId) -> bool {
        self.course_ids.contains(course_id)
    }

    pub fn is_empty(&self) -> bool {
        self.course_ids.is_empty()
    }
}

/// A canonical course plan.
///
/// `version` mirrors the stored row version and is only consulted when the
/// synchronizer runs with [`crate::ConflictPolicy::RejectStale`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoursePlan {
    pub id: PlanId,
    pub owner_id: OwnerId,
    pub total_semesters: u32,
    pub semesters: Vec<Semester>,
    pub version: i64,
}

impl CoursePlan {
    /// Semesters `1..=count`, all empty.
    pub fn empty_semesters(count: u32) -> Vec<Semester> {
        (1..=count).map(Semester::empty).collect()
    }

    pub fn semester(&self, id: SemesterId) -> Option<&Semester> {
        self.semesters.iter().find(|s| s.id == id)
    }

    /// The semester holding `course_id`, if it is placed anywhere.
    pub fn semester_of(&self, course_id: &CourseId) -> Option<SemesterId> {
        self.semesters
            .iter()
            .find(|s| s.contains(course_id))
            .map(|s| s.id)
    }

    pub fn contains(&self, course_id: &CourseId) -> bool {
        self.semester_of(course_id).is_some()
    }

    /// Number of course placements across all semesters.
    pub fn placed_count(&self) -> usize {
        self.semesters.iter().map(|s| s.course_ids.len()).sum()
    }

    /// The semesters array in its stored JSON shape.
    pub fn semesters_json(&self) -> serde_json::Value {
        semesters_to_json(&self.semesters)
    }

    /// Describe every broken structural invariant: duplicate placements,
    /// a semester count that disagrees with `total_semesters`, and
    /// non-contiguous semester ids. Empty when the plan is sound.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.semesters.len() != self.total_semesters as usize {
            problems.push(format!(
                "plan has {} semesters but total_semesters is {}",
                self.semesters.len(),
                self.total_semesters
            ));
        }

        for (idx, semester) in self.semesters.iter().enumerate() {
            let expected = idx as u32 + 1;
            if semester.id != expected {
                problems.push(format!(
                    "semester at position {expected} has id {}",
                    semester.id
                ));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for semester in &self.semesters {
            for course_id in &semester.course_ids {
                if !seen.insert(course_id) {
                    problems.push(format!("course {course_id} is placed more than once"));
                }
            }
        }

        problems
    }
}

pub(crate) fn semesters_to_json(semesters: &[Semester]) -> serde_json::Value {
    // Semester only holds u32 and strings; serialization cannot fail.
    serde_json::to_value(semesters).unwrap_or_else(|_| serde_json::Value::Array(Vec::new()))
}
