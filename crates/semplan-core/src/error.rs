use thiserror::Error;

use crate::catalog::CourseField;
use crate::plan::{CourseId, PlanId, SemesterId};
use crate::store::StoreError;

/// Errors surfaced by plan and catalog operations.
///
/// Mutator errors are values: the session turns them into notices and
/// leaves the plan as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("no authenticated user")]
    NotAuthenticated,

    #[error("course {course_id} is already placed in semester {semester_id}")]
    DuplicatePlacement {
        course_id: CourseId,
        semester_id: SemesterId,
    },

    #[error("semester {0} does not exist in this plan")]
    SemesterNotFound(SemesterId),

    #[error("field {0:?} is not editable (editable fields: grade, isRequired)")]
    FieldNotEditable(String),

    #[error("invalid value {value:?} for field {field}")]
    InvalidFieldValue { field: CourseField, value: String },

    #[error("course {0} not found in catalog")]
    CourseNotFound(CourseId),

    #[error("invalid course: {0}")]
    InvalidCourse(String),

    #[error(
        "semester count must be between 1 and {max}, got {0}",
        max = crate::plan::MAX_SEMESTER_COUNT
    )]
    InvalidSemesterCount(u32),

    #[error("plan {plan_id} changed since version {expected}; reload and retry")]
    StaleWrite { plan_id: PlanId, expected: i64 },

    #[error(transparent)]
    StoreUnavailable(StoreError),
}

impl From<StoreError> for PlanError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict { plan_id, expected } => {
                Self::StaleWrite { plan_id, expected }
            }
            other => Self::StoreUnavailable(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn version_conflict_maps_to_stale_write() {
        let plan_id = PlanId(Uuid::nil());
        let err = PlanError::from(StoreError::VersionConflict {
            plan_id,
            expected: 3,
        });
        assert_eq!(
            err,
            PlanError::StaleWrite {
                plan_id,
                expected: 3
            }
        );
    }

    #[test]
    fn other_store_errors_map_to_unavailable() {
        let err = PlanError::from(StoreError::Unavailable("connection refused".into()));
        assert!(matches!(err, PlanError::StoreUnavailable(_)));
        assert!(err.to_string().contains("connection refused"));
    }
}
