//! Pure plan mutations.
//!
//! Every function takes the current plan by reference and returns the next
//! state; none of them perform I/O. Callers persist the result.

use super::{CourseId, CoursePlan, MAX_SEMESTER_COUNT, Semester, SemesterId};
use crate::error::PlanError;

/// A shrink that would unplace courses. Returned instead of committing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestructiveResize {
    pub new_total: u32,
    /// Courses placed in the semesters that would be dropped.
    pub affected_course_count: usize,
    pub dropped_semesters: Vec<SemesterId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResizeOutcome {
    Resized(CoursePlan),
    /// Needs explicit confirmation, then [`force_resize_semesters`].
    Blocked(DestructiveResize),
}

/// Append `course_id` to semester `semester_id`.
///
/// Fails with [`PlanError::DuplicatePlacement`] when the course is already in
/// any semester, and with [`PlanError::SemesterNotFound`] when the target
/// semester does not exist.
pub fn add_course(
    plan: &CoursePlan,
    semester_id: SemesterId,
    course_id: &CourseId,
) -> Result<CoursePlan, PlanError> {
    if let Some(existing) = plan.semester_of(course_id) {
        return Err(PlanError::DuplicatePlacement {
            course_id: course_id.clone(),
            semester_id: existing,
        });
    }

    let mut next = plan.clone();
    let semester = semester_mut(&mut next, semester_id)
        .ok_or(PlanError::SemesterNotFound(semester_id))?;
    semester.course_ids.push(course_id.clone());
    Ok(next)
}

/// Remove `course_id` from semester `semester_id`. A no-op when the course
/// (or the semester) is absent.
pub fn remove_course(
    plan: &CoursePlan,
    semester_id: SemesterId,
    course_id: &CourseId,
) -> CoursePlan {
    let mut next = plan.clone();
    if let Some(semester) = semester_mut(&mut next, semester_id) {
        if let Some(pos) = semester.course_ids.iter().position(|id| id == course_id) {
            semester.course_ids.remove(pos);
        }
    }
    next
}

/// Move `course_id` from `from` to the end of `to`.
///
/// Returns the plan unchanged when the course is not in `from` or `to` does
/// not exist, so a stale request can never leave the course unplaced.
pub fn move_course(
    plan: &CoursePlan,
    course_id: &CourseId,
    from: SemesterId,
    to: SemesterId,
) -> CoursePlan {
    let in_source = plan.semester(from).is_some_and(|s| s.contains(course_id));
    if !in_source || plan.semester(to).is_none() {
        return plan.clone();
    }

    let removed = remove_course(plan, from, course_id);
    // The course was just removed, so the duplicate check cannot trip and
    // the target exists.
    add_course(&removed, to, course_id).unwrap_or_else(|_| plan.clone())
}

/// Resize the plan to `new_total` semesters.
///
/// Growing appends empty semesters. Shrinking drops the trailing semesters;
/// if any of them hold courses the change is not applied and
/// [`ResizeOutcome::Blocked`] describes what would be lost.
pub fn resize_semesters(plan: &CoursePlan, new_total: u32) -> Result<ResizeOutcome, PlanError> {
    if !(1..=MAX_SEMESTER_COUNT).contains(&new_total) {
        return Err(PlanError::InvalidSemesterCount(new_total));
    }

    let keep = new_total as usize;
    if keep < plan.semesters.len() {
        let dropped = &plan.semesters[keep..];
        let affected: usize = dropped.iter().map(|s| s.course_ids.len()).sum();
        if affected > 0 {
            return Ok(ResizeOutcome::Blocked(DestructiveResize {
                new_total,
                affected_course_count: affected,
                dropped_semesters: dropped.iter().map(|s| s.id).collect(),
            }));
        }
    }

    force_resize_semesters(plan, new_total).map(ResizeOutcome::Resized)
}

/// Resize without the destructive-change check. Courses in dropped
/// semesters leave the plan; the catalog is not touched.
pub fn force_resize_semesters(plan: &CoursePlan, new_total: u32) -> Result<CoursePlan, PlanError> {
    if !(1..=MAX_SEMESTER_COUNT).contains(&new_total) {
        return Err(PlanError::InvalidSemesterCount(new_total));
    }

    let mut next = plan.clone();
    let keep = new_total as usize;
    if keep <= next.semesters.len() {
        next.semesters.truncate(keep);
    } else {
        let first_new = next.semesters.len() as u32 + 1;
        next.semesters
            .extend((first_new..=new_total).map(Semester::empty));
    }
    next.total_semesters = new_total;
    Ok(next)
}

fn semester_mut(plan: &mut CoursePlan, id: SemesterId) -> Option<&mut Semester> {
    plan.semesters.iter_mut().find(|s| s.id == id)
}
