//! Per-session application state.
//!
//! A [`PlanSession`] owns the in-memory mirror of one user's plan and
//! catalog, the queue of transient notices, and the two-step confirmation
//! for destructive resizes. Each plan action reloads the plan, applies a pure
//! mutation, updates the mirror and then commits. A failed commit is
//! reported but the mirror keeps the optimistic state.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::catalog::{Catalog, CourseDraft, CourseFieldUpdate, apply_field_update};
use crate::error::PlanError;
use crate::plan::{
    CourseId, CoursePlan, DestructiveResize, OwnerId, ResizeOutcome, SemesterId, add_course,
    force_resize_semesters, move_course, remove_course, resize_semesters,
};
use crate::store::AuthProvider;
use crate::sync::PlanSynchronizer;
use crate::view::{BrowseView, PlanView};

/// How long a notice stays visible.
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_secs(6);

/// First confirmation before a resize unplaces courses.
pub const SHRINK_WARNING: &str = "WARNING: Reducing the number of semesters will permanently \
     delete courses from the removed semesters. Are you sure you want to continue?";

/// Second confirmation before a resize unplaces courses.
pub const SHRINK_FINAL_WARNING: &str = "This action cannot be undone. All courses in the \
     removed semesters will be permanently deleted. Continue?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    raised_at: Instant,
}

impl Notice {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            raised_at: Instant::now(),
        }
    }

    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) >= ttl
    }
}

/// What happened to a requested action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Applied and persisted.
    Committed,
    /// The action was a no-op; nothing was written.
    Unchanged,
    /// Not applied: the plan could not be loaded or the mutation failed.
    Rejected(PlanError),
    /// Applied to the mirror but not persisted.
    Unsaved(PlanError),
    /// A destructive resize was not confirmed.
    Declined,
    /// Nobody is signed in.
    Aborted,
}

impl ActionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed)
    }
}

/// Asks the user to confirm a destructive resize. Called at most twice per
/// resize, with [`SHRINK_WARNING`] then [`SHRINK_FINAL_WARNING`].
pub trait ResizeConfirmer {
    fn confirm(&mut self, prompt: &str, resize: &DestructiveResize) -> bool;
}

impl<F> ResizeConfirmer for F
where
    F: FnMut(&str, &DestructiveResize) -> bool,
{
    fn confirm(&mut self, prompt: &str, resize: &DestructiveResize) -> bool {
        self(prompt, resize)
    }
}

pub struct PlanSession {
    sync: PlanSynchronizer,
    auth: Arc<dyn AuthProvider>,
    plan: Option<CoursePlan>,
    catalog: Option<Catalog>,
    notices: Vec<Notice>,
    notice_ttl: Duration,
}

impl fmt::Debug for PlanSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanSession")
            .field("sync", &self.sync)
            .field("plan", &self.plan)
            .field("catalog", &self.catalog)
            .field("notices", &self.notices)
            .finish_non_exhaustive()
    }
}

impl PlanSession {
    pub fn new(sync: PlanSynchronizer, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            sync,
            auth,
            plan: None,
            catalog: None,
            notices: Vec::new(),
            notice_ttl: DEFAULT_NOTICE_TTL,
        }
    }

    pub fn with_notice_ttl(mut self, ttl: Duration) -> Self {
        self.notice_ttl = ttl;
        self
    }

    pub fn plan(&self) -> Option<&CoursePlan> {
        self.plan.as_ref()
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    /// `None` until both plan and catalog have been loaded.
    pub fn plan_view(&self) -> Option<PlanView> {
        Some(PlanView::build(self.plan.as_ref()?, self.catalog.as_ref()?))
    }

    pub fn browse_view(&self) -> Option<BrowseView> {
        Some(BrowseView::build(self.catalog.as_ref()?, self.plan.as_ref()))
    }

    /// Notices that have not expired yet. Expired ones are discarded.
    pub fn active_notices(&mut self) -> &[Notice] {
        let now = Instant::now();
        let ttl = self.notice_ttl;
        self.notices.retain(|n| !n.is_expired(ttl, now));
        &self.notices
    }

    /// Take every pending notice, expired or not.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Reload plan and catalog into the mirror.
    pub async fn refresh(&mut self) -> Result<(), PlanError> {
        let owner = self.owner().await.ok_or(PlanError::NotAuthenticated)?;

        let loaded = futures::future::try_join(
            self.sync.load(owner),
            self.sync.reconcile_catalog(owner),
        )
        .await;

        match loaded {
            Ok((plan, catalog)) => {
                self.plan = Some(plan);
                self.catalog = Some(catalog);
                Ok(())
            }
            Err(e) => {
                self.notify(Severity::Error, format!("Failed to load course plan: {e}"));
                Err(e)
            }
        }
    }

    pub async fn add_course(
        &mut self,
        semester_id: SemesterId,
        course_id: &CourseId,
    ) -> ActionOutcome {
        let current = match self.begin_plan_action().await {
            Ok(plan) => plan,
            Err(outcome) => return outcome,
        };
        let next = add_course(&current, semester_id, course_id);
        let added = format!("Added {} to Semester {semester_id}", self.label(course_id));
        self.finish_plan_action(current, next, Some(added)).await
    }

    pub async fn remove_course(
        &mut self,
        semester_id: SemesterId,
        course_id: &CourseId,
    ) -> ActionOutcome {
        let current = match self.begin_plan_action().await {
            Ok(plan) => plan,
            Err(outcome) => return outcome,
        };
        let next = remove_course(&current, semester_id, course_id);
        self.finish_plan_action(current, Ok(next), None).await
    }

    pub async fn move_course(
        &mut self,
        course_id: &CourseId,
        from: SemesterId,
        to: SemesterId,
    ) -> ActionOutcome {
        let current = match self.begin_plan_action().await {
            Ok(plan) => plan,
            Err(outcome) => return outcome,
        };
        let next = move_course(&current, course_id, from, to);
        self.finish_plan_action(current, Ok(next), None).await
    }

    /// Resize the plan. A shrink that would unplace courses goes ahead only
    /// if `confirmer` accepts both warnings.
    pub async fn resize_semesters(
        &mut self,
        new_total: u32,
        confirmer: &mut dyn ResizeConfirmer,
    ) -> ActionOutcome {
        let current = match self.begin_plan_action().await {
            Ok(plan) => plan,
            Err(outcome) => return outcome,
        };

        let next = match resize_semesters(&current, new_total) {
            Ok(ResizeOutcome::Resized(next)) => Ok(next),
            Ok(ResizeOutcome::Blocked(resize)) => {
                let confirmed = confirmer.confirm(SHRINK_WARNING, &resize)
                    && confirmer.confirm(SHRINK_FINAL_WARNING, &resize);
                if !confirmed {
                    tracing::debug!(
                        plan_id = %current.id,
                        new_total,
                        "destructive resize declined"
                    );
                    self.plan = Some(current);
                    return ActionOutcome::Declined;
                }
                tracing::info!(
                    plan_id = %current.id,
                    new_total,
                    affected_courses = resize.affected_course_count,
                    "confirmed destructive resize"
                );
                force_resize_semesters(&current, new_total)
            }
            Err(e) => Err(e),
        };
        self.finish_plan_action(current, next, None).await
    }

    /// Edit `grade` or `isRequired` of a catalog course.
    pub async fn update_course_field(
        &mut self,
        course_id: &CourseId,
        field: &str,
        value: &str,
    ) -> ActionOutcome {
        let Some(owner) = self.owner().await else {
            return ActionOutcome::Aborted;
        };
        let catalog = match self.catalog.take() {
            Some(catalog) => catalog,
            None => match self.sync.reconcile_catalog(owner).await {
                Ok(catalog) => catalog,
                Err(e) => {
                    self.notify(Severity::Error, format!("Failed to load courses: {e}"));
                    return ActionOutcome::Rejected(e);
                }
            },
        };

        let edited = CourseFieldUpdate::parse(field, value)
            .and_then(|update| Ok((apply_field_update(&catalog, course_id, &update)?, update)));
        let (next, update) = match edited {
            Ok(edited) => edited,
            Err(e) => {
                self.catalog = Some(catalog);
                self.notify(Severity::Warning, e.to_string());
                return ActionOutcome::Rejected(e);
            }
        };

        self.catalog = Some(next);
        match self.sync.persist_field_update(course_id, &update).await {
            Ok(()) => ActionOutcome::Committed,
            Err(e) => {
                self.notify(Severity::Error, format!("Failed to update course: {e}"));
                ActionOutcome::Unsaved(e)
            }
        }
    }

    /// Save a course from the browse view (insert, or update by code).
    pub async fn save_course(&mut self, draft: &CourseDraft) -> ActionOutcome {
        let Some(owner) = self.owner().await else {
            return ActionOutcome::Aborted;
        };

        match self.sync.save_course(owner, draft).await {
            Ok(course) => {
                self.notify(
                    Severity::Success,
                    format!("Course {} saved successfully", course.code),
                );
                self.catalog
                    .get_or_insert_with(|| Catalog::new(owner, Vec::new()))
                    .upsert(course);
                ActionOutcome::Committed
            }
            Err(e @ PlanError::InvalidCourse(_)) => {
                self.notify(Severity::Warning, e.to_string());
                ActionOutcome::Rejected(e)
            }
            Err(e) => {
                tracing::warn!(owner = %owner, error = %e, "failed to save course");
                self.notify(Severity::Error, "Failed to save course");
                ActionOutcome::Unsaved(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// The signed-in user. Auth failures count as signed out.
    async fn owner(&self) -> Option<OwnerId> {
        match self.auth.current_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "authentication provider failed");
                None
            }
        }
    }

    /// Resolve the owner and load a fresh canonical plan.
    async fn begin_plan_action(&mut self) -> Result<CoursePlan, ActionOutcome> {
        let Some(owner) = self.owner().await else {
            return Err(ActionOutcome::Aborted);
        };
        match self.sync.load(owner).await {
            Ok(plan) => Ok(plan),
            Err(e) => {
                self.notify(Severity::Error, format!("Failed to load course plan: {e}"));
                Err(ActionOutcome::Rejected(e))
            }
        }
    }

    async fn finish_plan_action(
        &mut self,
        current: CoursePlan,
        next: Result<CoursePlan, PlanError>,
        success: Option<String>,
    ) -> ActionOutcome {
        let next = match next {
            Ok(next) => next,
            Err(e) => {
                let message = self.describe(&e);
                self.plan = Some(current);
                self.notify(Severity::Warning, message);
                return ActionOutcome::Rejected(e);
            }
        };

        if next == current {
            self.plan = Some(current);
            return ActionOutcome::Unchanged;
        }

        self.plan = Some(next.clone());
        match self.sync.commit(&next).await {
            Ok(committed) => {
                self.plan = Some(committed);
                if let Some(message) = success {
                    self.notify(Severity::Success, message);
                }
                ActionOutcome::Committed
            }
            Err(e) => {
                tracing::warn!(plan_id = %next.id, error = %e, "plan commit failed");
                self.notify(Severity::Error, format!("Failed to save course plan: {e}"));
                ActionOutcome::Unsaved(e)
            }
        }
    }

    fn describe(&self, err: &PlanError) -> String {
        match err {
            PlanError::DuplicatePlacement { course_id, .. } => {
                format!("{} is already in your course plan.", self.label(course_id))
            }
            other => other.to_string(),
        }
    }

    fn label(&self, course_id: &CourseId) -> String {
        self.catalog
            .as_ref()
            .map(|c| c.label(course_id))
            .unwrap_or_else(|| course_id.to_string())
    }

    fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        self.notices.push(Notice::new(severity, message));
    }
}
