//! Stored plan -> canonical plan.
//!
//! Stored semesters come in two shapes:
//!
//! ```text
//! legacy:   {"id": 1, "courses": [{"id": "X", "code": "CS1", ...}, ...]}
//! current:  {"id": 1, "courseIds": ["X", ...]}
//! ```
//!
//! An entry is legacy only when `courses` is non-empty and its first element
//! is not a string. `{"id": 1, "courses": []}` is read as a current-format
//! empty semester.
//!
//! Normalization never fails. Entries that match neither shape are dropped
//! and reported, which also marks the plan as changed so the caller writes
//! the cleaned form back.
//!
//! A semester id is its position: the canonical array always holds ids
//! `1..=n` in order. Gaps are filled with empty semesters and entries that
//! repeat an id are merged into the first.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use tracing::warn;

use super::{
    CourseId, CoursePlan, DEFAULT_SEMESTER_COUNT, MAX_SEMESTER_COUNT, Semester, SemesterId,
    semesters_to_json,
};
use crate::store::PlanRecord;

/// What normalization did to a stored semesters array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// The canonical array differs from the stored one and should be
    /// written back.
    pub changed: bool,
    /// Semesters converted from the legacy embedded-course shape.
    pub legacy_semesters: usize,
    /// Semester entries or course references that were unusable.
    pub skipped_entries: usize,
    /// Course ids removed because an earlier semester already held them.
    pub duplicates_removed: usize,
}

/// Result of normalizing a stored plan record.
#[derive(Debug, Clone)]
pub struct Normalized {
    /// The plan the session works with, conformed to `total_semesters`.
    pub plan: CoursePlan,
    /// The full canonical semesters array to persist when
    /// `report.changed` is set. May hold more semesters than `plan`.
    pub stored_semesters: Vec<Semester>,
    pub report: NormalizeReport,
}

/// Normalize a stored plan record.
///
/// The in-memory plan shows the first `total_semesters` semesters and pads
/// with empty ones if the stored array is short. Only shape changes (not the
/// padding or trimming) are reported as `changed`.
pub fn normalize(record: &PlanRecord) -> Normalized {
    let (stored_semesters, report) = normalize_semesters(&record.semesters);

    let total = u32::try_from(record.total_semesters)
        .ok()
        .filter(|n| *n > 0)
        .map_or(DEFAULT_SEMESTER_COUNT, |n| n.min(MAX_SEMESTER_COUNT));

    let mut semesters: Vec<Semester> = stored_semesters
        .iter()
        .take(total as usize)
        .cloned()
        .collect();
    for id in (semesters.len() as u32 + 1)..=total {
        semesters.push(Semester::empty(id));
    }

    Normalized {
        plan: CoursePlan {
            id: record.id,
            owner_id: record.owner_id,
            total_semesters: total,
            semesters,
            version: record.version,
        },
        stored_semesters,
        report,
    }
}

/// Convert a stored semesters array to canonical semesters.
pub fn normalize_semesters(raw: &Value) -> (Vec<Semester>, NormalizeReport) {
    let mut report = NormalizeReport::default();
    let entries = raw.as_array().map(Vec::as_slice).unwrap_or_default();

    let mut by_id: BTreeMap<SemesterId, Vec<CourseId>> = BTreeMap::new();
    for entry in entries {
        match normalize_entry(entry, &mut report) {
            Some(semester) => by_id
                .entry(semester.id)
                .or_default()
                .extend(semester.course_ids),
            None => {
                report.skipped_entries += 1;
                warn!(entry = %entry, "dropping unreadable semester entry");
            }
        }
    }

    let last = by_id.last_key_value().map_or(0, |(id, _)| *id);
    let mut semesters: Vec<Semester> = (1..=last)
        .map(|id| Semester {
            id,
            course_ids: by_id.remove(&id).unwrap_or_default(),
        })
        .collect();

    let mut placed: HashSet<CourseId> = HashSet::new();
    for semester in &mut semesters {
        let before = semester.course_ids.len();
        semester.course_ids.retain(|id| placed.insert(id.clone()));
        report.duplicates_removed += before - semester.course_ids.len();
    }

    report.changed = semesters_to_json(&semesters) != *raw;
    (semesters, report)
}

fn normalize_entry(entry: &Value, report: &mut NormalizeReport) -> Option<Semester> {
    let obj = entry.as_object()?;
    let id = obj
        .get("id")
        .and_then(Value::as_u64)
        .and_then(|id| u32::try_from(id).ok())
        .filter(|id| (1..=MAX_SEMESTER_COUNT).contains(id))?;

    let legacy_courses = obj
        .get("courses")
        .and_then(Value::as_array)
        .filter(|courses| courses.first().is_some_and(|first| !first.is_string()));

    let references: &[Value] = match legacy_courses {
        Some(courses) => {
            report.legacy_semesters += 1;
            courses.as_slice()
        }
        None => obj
            .get("courseIds")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
    };

    let mut course_ids = Vec::with_capacity(references.len());
    for reference in references {
        let id_value = if legacy_courses.is_some() {
            reference.get("id")
        } else {
            Some(reference)
        };
        match id_value.and_then(reference_to_id) {
            Some(course_id) => course_ids.push(course_id),
            None => {
                report.skipped_entries += 1;
                warn!(
                    semester = id,
                    reference = %reference,
                    "dropping unreadable course reference"
                );
            }
        }
    }

    Some(Semester { id, course_ids })
}

fn reference_to_id(value: &Value) -> Option<CourseId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(CourseId::new(s.as_str())),
        Value::Number(n) => Some(CourseId::new(n.to_string())),
        _ => None,
    }
}
