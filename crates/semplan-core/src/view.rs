//! View-models for the plan and browse screens.
//!
//! Built from the session mirror; rendering is left to the caller.

use serde::Serialize;

use crate::catalog::{Catalog, Course};
use crate::plan::{CourseId, CoursePlan, SemesterId};

/// One semester with its course ids resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SemesterView {
    pub id: SemesterId,
    pub courses: Vec<Course>,
    pub credits: u32,
}

/// The plan screen: every semester in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanView {
    pub total_semesters: u32,
    pub semesters: Vec<SemesterView>,
    pub total_credits: u32,
    /// Placed ids with no catalog course. Not rendered.
    pub dangling: Vec<CourseId>,
}

impl PlanView {
    pub fn build(plan: &CoursePlan, catalog: &Catalog) -> Self {
        let mut dangling = Vec::new();
        let semesters: Vec<SemesterView> = plan
            .semesters
            .iter()
            .map(|semester| {
                let mut courses = Vec::with_capacity(semester.course_ids.len());
                for id in &semester.course_ids {
                    match catalog.get(id) {
                        Some(course) => courses.push(course.clone()),
                        None => dangling.push(id.clone()),
                    }
                }
                let credits = courses.iter().map(|c| c.credits).sum();
                SemesterView {
                    id: semester.id,
                    courses,
                    credits,
                }
            })
            .collect();

        Self {
            total_semesters: plan.total_semesters,
            total_credits: semesters.iter().map(|s| s.credits).sum(),
            semesters,
            dangling,
        }
    }
}

/// A catalog course and where the plan places it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowseEntry {
    pub course: Course,
    pub placed_in: Option<SemesterId>,
}

/// The browse screen: the whole catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowseView {
    pub entries: Vec<BrowseEntry>,
}

impl BrowseView {
    /// With no plan loaded every course shows as unplaced.
    pub fn build(catalog: &Catalog, plan: Option<&CoursePlan>) -> Self {
        let entries = catalog
            .courses()
            .iter()
            .map(|course| BrowseEntry {
                course: course.clone(),
                placed_in: plan.and_then(|p| p.semester_of(&course.id)),
            })
            .collect();
        Self { entries }
    }

    pub fn unplaced(&self) -> impl Iterator<Item = &Course> {
        self.entries
            .iter()
            .filter(|e| e.placed_in.is_none())
            .map(|e| &e.course)
    }
}
