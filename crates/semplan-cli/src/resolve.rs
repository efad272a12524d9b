//! Course reference resolution.
//!
//! Commands accept a course as either its id or its code. Codes are matched
//! exactly first, then case-insensitively. An id that is only present in the
//! plan (its catalog course is gone) is still accepted so it can be removed
//! or moved.

use anyhow::{Result, bail};

use semplan_core::{Catalog, CourseId, CoursePlan};

pub fn resolve_course(
    catalog: &Catalog,
    plan: Option<&CoursePlan>,
    input: &str,
) -> Result<CourseId> {
    let input = input.trim();
    if input.is_empty() {
        bail!("course reference is empty");
    }

    if let Some(course) = catalog.resolve(input) {
        return Ok(course.id.clone());
    }

    let raw = CourseId::from(input);
    if plan.is_some_and(|p| p.contains(&raw)) {
        return Ok(raw);
    }

    bail!("no course matches {input:?}; run `semplan course list` to see your courses")
}
