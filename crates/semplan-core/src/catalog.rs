//! The owner's course catalog and the edits allowed on it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::plan::{CourseId, OwnerId};

/// A course definition owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub owner_id: OwnerId,
    pub code: String,
    pub name: String,
    pub credits: u32,
    pub is_required: bool,
    /// Course codes, not ids.
    pub prerequisites: Vec<String>,
    pub grade: Option<String>,
    /// Semester the course was filed under when it was last saved.
    pub semester: Option<u32>,
}

// ---------------------------------------------------------------------------
// Editable fields
// ---------------------------------------------------------------------------

/// Fields that may be edited from the plan view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CourseField {
    Grade,
    IsRequired,
}

impl fmt::Display for CourseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Grade => "grade",
            Self::IsRequired => "isRequired",
        };
        f.write_str(s)
    }
}

impl FromStr for CourseField {
    type Err = PlanError;

    /// Accepts both the camelCase and the stored snake_case spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grade" => Ok(Self::Grade),
            "isRequired" | "is_required" => Ok(Self::IsRequired),
            other => Err(PlanError::FieldNotEditable(other.to_owned())),
        }
    }
}

/// A typed edit of one [`CourseField`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourseFieldUpdate {
    /// `None` clears the grade.
    Grade(Option<String>),
    IsRequired(bool),
}

impl CourseFieldUpdate {
    /// Parse a `(field, value)` pair as entered in the UI.
    ///
    /// An empty or blank grade clears it. `isRequired` takes
    /// `true/false`, `yes/no` or `1/0`.
    pub fn parse(field: &str, value: &str) -> Result<Self, PlanError> {
        let field: CourseField = field.parse()?;
        let value = value.trim();
        match field {
            CourseField::Grade => Ok(Self::Grade(
                Some(value.to_owned()).filter(|g| !g.is_empty()),
            )),
            CourseField::IsRequired => match value.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Self::IsRequired(true)),
                "false" | "no" | "0" => Ok(Self::IsRequired(false)),
                _ => Err(PlanError::InvalidFieldValue {
                    field,
                    value: value.to_owned(),
                }),
            },
        }
    }

    pub fn field(&self) -> CourseField {
        match self {
            Self::Grade(_) => CourseField::Grade,
            Self::IsRequired(_) => CourseField::IsRequired,
        }
    }

    /// Apply the edit to a single course.
    pub fn apply(&self, course: &mut Course) {
        match self {
            Self::Grade(grade) => course.grade = grade.clone(),
            Self::IsRequired(required) => course.is_required = *required,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// All courses of one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    owner_id: OwnerId,
    courses: Vec<Course>,
}

impl Catalog {
    pub fn new(owner_id: OwnerId, courses: Vec<Course>) -> Self {
        Self { owner_id, courses }
    }

    pub fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn get(&self, id: &CourseId) -> Option<&Course> {
        self.courses.iter().find(|c| &c.id == id)
    }

    /// Exact code match first, then a case-insensitive one.
    pub fn find_by_code(&self, code: &str) -> Option<&Course> {
        let code = code.trim();
        self.courses
            .iter()
            .find(|c| c.code == code)
            .or_else(|| self.courses.iter().find(|c| c.code.eq_ignore_ascii_case(code)))
    }

    /// Look a course up by id first, then by code.
    pub fn resolve(&self, reference: &str) -> Option<&Course> {
        self.get(&CourseId::from(reference))
            .or_else(|| self.find_by_code(reference))
    }

    /// Code of `id` for user-facing messages, or the id itself when the
    /// course is not in the catalog.
    pub fn label(&self, id: &CourseId) -> String {
        self.get(id)
            .map(|c| c.code.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Replace the course with the same id, or append it.
    pub fn upsert(&mut self, course: Course) {
        match self.courses.iter_mut().find(|c| c.id == course.id) {
            Some(existing) => *existing = course,
            None => self.courses.push(course),
        }
    }
}

/// Return a catalog with one field of `course_id` changed.
///
/// Only [`CourseField`] names are accepted; anything else fails with
/// [`PlanError::FieldNotEditable`]. The input catalog is left untouched.
pub fn update_course_field(
    catalog: &Catalog,
    course_id: &CourseId,
    field: &str,
    value: &str,
) -> Result<Catalog, PlanError> {
    let update = CourseFieldUpdate::parse(field, value)?;
    apply_field_update(catalog, course_id, &update)
}

/// Typed form of [`update_course_field`].
pub fn apply_field_update(
    catalog: &Catalog,
    course_id: &CourseId,
    update: &CourseFieldUpdate,
) -> Result<Catalog, PlanError> {
    let mut next = catalog.clone();
    let course = next
        .courses
        .iter_mut()
        .find(|c| &c.id == course_id)
        .ok_or_else(|| PlanError::CourseNotFound(course_id.clone()))?;
    update.apply(course);
    Ok(next)
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// A course as entered in the browse view, before it is saved.
///
/// Saving upserts by `(owner, code)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDraft {
    pub code: String,
    pub name: String,
    pub credits: u32,
    pub is_required: bool,
    pub prerequisites: Vec<String>,
    pub semester: Option<u32>,
}

impl CourseDraft {
    pub fn new(code: impl Into<String>, name: impl Into<String>, credits: u32) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            credits,
            ..Self::default()
        }
    }

    pub fn required(mut self, is_required: bool) -> Self {
        self.is_required = is_required;
        self
    }

    pub fn semester(mut self, semester: u32) -> Self {
        self.semester = Some(semester);
        self
    }

    /// Add a prerequisite code. Blank and repeated codes are ignored.
    pub fn add_prerequisite(&mut self, code: &str) {
        let code = code.trim();
        if !code.is_empty() && !self.prerequisites.iter().any(|p| p == code) {
            self.prerequisites.push(code.to_owned());
        }
    }

    pub fn remove_prerequisite(&mut self, code: &str) {
        self.prerequisites.retain(|p| p != code);
    }

    /// Builder form of [`Self::add_prerequisite`].
    pub fn prerequisite(mut self, code: &str) -> Self {
        self.add_prerequisite(code);
        self
    }

    /// Trim text fields, drop blank or repeated prerequisites and check that
    /// code and name are present and credits are positive.
    pub fn validated(&self) -> Result<Self, PlanError> {
        let code = self.code.trim();
        if code.is_empty() {
            return Err(PlanError::InvalidCourse("course code is required".into()));
        }
        let name = self.name.trim();
        if name.is_empty() {
            return Err(PlanError::InvalidCourse(format!("course {code} needs a name")));
        }
        if self.credits == 0 {
            return Err(PlanError::InvalidCourse(format!(
                "course {code} must carry a positive number of credits"
            )));
        }

        let mut clean = Self {
            code: code.to_owned(),
            name: name.to_owned(),
            credits: self.credits,
            is_required: self.is_required,
            prerequisites: Vec::with_capacity(self.prerequisites.len()),
            semester: self.semester,
        };
        for prereq in &self.prerequisites {
            clean.add_prerequisite(prereq);
        }
        Ok(clean)
    }
}
