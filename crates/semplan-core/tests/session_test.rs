//! Session mirror, notices and confirmation flow.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use uuid::Uuid;

use semplan_core::plan::DestructiveResize;
use semplan_core::session::{SHRINK_FINAL_WARNING, SHRINK_WARNING};
use semplan_core::{
    ActionOutcome, CourseDraft, CourseId, MemoryStore, OwnerId, PlanError, PlanSession,
    PlanSynchronizer, SessionAuth, Severity,
};

struct Harness {
    store: Arc<MemoryStore>,
    owner: OwnerId,
    session: PlanSession,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let owner = OwnerId(Uuid::new_v4());
    let session = PlanSession::new(
        PlanSynchronizer::new(store.clone()),
        Arc::new(SessionAuth::signed_in(owner)),
    );
    Harness {
        store,
        owner,
        session,
    }
}

impl Harness {
    async fn course(&mut self, code: &str) -> CourseId {
        let outcome = self
            .session
            .save_course(&CourseDraft::new(code, format!("{code} course"), 3))
            .await;
        assert_eq!(outcome, ActionOutcome::Committed);
        self.session.drain_notices();
        self.session
            .catalog()
            .and_then(|c| c.find_by_code(code))
            .map(|c| c.id.clone())
            .unwrap()
    }

    fn messages(&mut self) -> Vec<(Severity, String)> {
        self.session
            .drain_notices()
            .into_iter()
            .map(|n| (n.severity, n.message))
            .collect()
    }
}

fn ids(session: &PlanSession, semester: u32) -> Vec<CourseId> {
    session
        .plan()
        .and_then(|p| p.semester(semester))
        .map(|s| s.course_ids.clone())
        .unwrap_or_default()
}

#[tokio::test]
async fn signed_out_actions_abort_silently() {
    let store = Arc::new(MemoryStore::new());
    let mut session = PlanSession::new(
        PlanSynchronizer::new(store.clone()),
        Arc::new(SessionAuth::signed_out()),
    );

    assert_eq!(
        session.add_course(1, &CourseId::from("CS101")).await,
        ActionOutcome::Aborted
    );
    assert_eq!(
        session.save_course(&CourseDraft::new("CS1", "Intro", 3)).await,
        ActionOutcome::Aborted
    );
    assert_eq!(session.refresh().await, Err(PlanError::NotAuthenticated));
    assert!(session.drain_notices().is_empty());
    assert_eq!(store.write_count().await, 0);
}

#[tokio::test]
async fn add_then_duplicate_then_move() {
    let mut h = harness();
    let cs101 = h.course("CS101").await;

    assert_eq!(h.session.add_course(1, &cs101).await, ActionOutcome::Committed);
    assert_eq!(ids(&h.session, 1), vec![cs101.clone()]);
    assert_eq!(
        h.messages(),
        vec![(Severity::Success, "Added CS101 to Semester 1".to_owned())]
    );

    assert_matches!(
        h.session.add_course(2, &cs101).await,
        ActionOutcome::Rejected(PlanError::DuplicatePlacement { semester_id: 1, .. })
    );
    assert_eq!(
        h.messages(),
        vec![(Severity::Warning, "CS101 is already in your course plan.".to_owned())]
    );

    assert_eq!(h.session.move_course(&cs101, 1, 2).await, ActionOutcome::Committed);
    assert!(ids(&h.session, 1).is_empty());
    assert_eq!(ids(&h.session, 2), vec![cs101.clone()]);

    let stored = h.store.plan_record(h.owner).await.unwrap();
    assert_eq!(stored.semesters[1]["courseIds"][0], cs101.as_str());
}

#[tokio::test]
async fn noop_actions_do_not_write() {
    let mut h = harness();
    let cs101 = h.course("CS101").await;
    h.session.add_course(1, &cs101).await;
    let writes = h.store.write_count().await;

    assert_eq!(h.session.remove_course(3, &cs101).await, ActionOutcome::Unchanged);
    assert_eq!(h.session.move_course(&cs101, 4, 5).await, ActionOutcome::Unchanged);
    assert_eq!(h.store.write_count().await, writes);
}

#[tokio::test]
async fn failed_commit_keeps_optimistic_mirror() {
    let mut h = harness();
    let cs101 = h.course("CS101").await;
    h.session.refresh().await.unwrap();

    h.store.fail_next_writes(1).await;
    assert_matches!(
        h.session.add_course(1, &cs101).await,
        ActionOutcome::Unsaved(PlanError::StoreUnavailable(_))
    );

    assert_eq!(ids(&h.session, 1), vec![cs101]);
    let messages = h.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, Severity::Error);

    let stored = h.store.plan_record(h.owner).await.unwrap();
    assert_eq!(stored.semesters[0]["courseIds"], serde_json::json!([]));
}

#[tokio::test]
async fn load_failure_is_reported() {
    let mut h = harness();
    h.store.fail_next_reads(1).await;

    assert_matches!(
        h.session.add_course(1, &CourseId::from("X")).await,
        ActionOutcome::Rejected(PlanError::StoreUnavailable(_))
    );
    assert_eq!(h.messages()[0].0, Severity::Error);
}

#[tokio::test]
async fn missing_semester_is_rejected_with_warning() {
    let mut h = harness();
    assert_matches!(
        h.session.add_course(9, &CourseId::from("X")).await,
        ActionOutcome::Rejected(PlanError::SemesterNotFound(9))
    );
    assert_eq!(h.messages()[0].0, Severity::Warning);
}

#[tokio::test]
async fn destructive_resize_needs_two_confirmations() {
    let mut h = harness();
    let late = h.course("CS499").await;
    h.session.add_course(8, &late).await;

    // Declining the second prompt aborts with no effect.
    let mut prompts = Vec::new();
    let mut decline_second = |prompt: &str, resize: &DestructiveResize| {
        assert_eq!(resize.affected_course_count, 1);
        prompts.push(prompt.to_owned());
        prompts.len() < 2
    };
    assert_eq!(
        h.session.resize_semesters(4, &mut decline_second).await,
        ActionOutcome::Declined
    );
    assert_eq!(prompts, vec![SHRINK_WARNING, SHRINK_FINAL_WARNING]);
    assert_eq!(h.session.plan().unwrap().total_semesters, 8);
    assert_eq!(h.store.plan_record(h.owner).await.unwrap().total_semesters, 8);

    // Declining the first prompt never shows the second.
    let mut asked = 0;
    let mut decline_first = |_: &str, _: &DestructiveResize| {
        asked += 1;
        false
    };
    assert_eq!(
        h.session.resize_semesters(4, &mut decline_first).await,
        ActionOutcome::Declined
    );
    assert_eq!(asked, 1);

    let mut accept = |_: &str, _: &DestructiveResize| true;
    assert_eq!(
        h.session.resize_semesters(4, &mut accept).await,
        ActionOutcome::Committed
    );
    let plan = h.session.plan().unwrap();
    assert_eq!(plan.total_semesters, 4);
    assert!(!plan.contains(&late));
    assert_eq!(h.store.plan_record(h.owner).await.unwrap().total_semesters, 4);
}

#[tokio::test]
async fn resize_over_empty_semesters_skips_confirmation() {
    let mut h = harness();
    let mut never = |_: &str, _: &DestructiveResize| -> bool { panic!("no confirmation expected") };

    assert_eq!(h.session.resize_semesters(6, &mut never).await, ActionOutcome::Committed);
    assert_eq!(h.session.resize_semesters(10, &mut never).await, ActionOutcome::Committed);
    assert_eq!(h.session.plan().unwrap().semesters.len(), 10);
    assert_matches!(
        h.session.resize_semesters(0, &mut never).await,
        ActionOutcome::Rejected(PlanError::InvalidSemesterCount(0))
    );
}

#[tokio::test]
async fn course_field_edits_update_mirror_and_store() {
    let mut h = harness();
    let cs101 = h.course("CS101").await;

    assert_eq!(
        h.session.update_course_field(&cs101, "isRequired", "true").await,
        ActionOutcome::Committed
    );
    assert!(h.session.catalog().unwrap().get(&cs101).unwrap().is_required);

    assert_matches!(
        h.session.update_course_field(&cs101, "credits", "4").await,
        ActionOutcome::Rejected(PlanError::FieldNotEditable(_))
    );
    assert!(h.session.catalog().is_some());

    h.store.fail_next_writes(1).await;
    assert_matches!(
        h.session.update_course_field(&cs101, "grade", "B+").await,
        ActionOutcome::Unsaved(_)
    );
    assert_eq!(
        h.session.catalog().unwrap().get(&cs101).unwrap().grade.as_deref(),
        Some("B+")
    );
}

#[tokio::test]
async fn save_course_notices() {
    let mut h = harness();

    assert_eq!(
        h.session.save_course(&CourseDraft::new("CS101", "Intro", 3)).await,
        ActionOutcome::Committed
    );
    assert_eq!(
        h.messages(),
        vec![(Severity::Success, "Course CS101 saved successfully".to_owned())]
    );

    h.store.fail_next_writes(1).await;
    assert_matches!(
        h.session.save_course(&CourseDraft::new("CS102", "More", 3)).await,
        ActionOutcome::Unsaved(_)
    );
    assert_eq!(
        h.messages(),
        vec![(Severity::Error, "Failed to save course".to_owned())]
    );
}

#[tokio::test]
async fn views_follow_the_mirror() {
    let mut h = harness();
    let cs101 = h.course("CS101").await;
    h.course("MATH200").await;
    h.session.refresh().await.unwrap();
    h.session.add_course(2, &cs101).await;

    let plan_view = h.session.plan_view().unwrap();
    assert_eq!(plan_view.semesters[1].courses[0].code, "CS101");
    assert_eq!(plan_view.total_credits, 3);

    let browse = h.session.browse_view().unwrap();
    let unplaced: Vec<_> = browse.unplaced().map(|c| c.code.as_str()).collect();
    assert_eq!(unplaced, vec!["MATH200"]);
}

#[tokio::test]
async fn notices_expire() {
    let store = Arc::new(MemoryStore::new());
    let mut session = PlanSession::new(
        PlanSynchronizer::new(store),
        Arc::new(SessionAuth::signed_in(OwnerId(Uuid::new_v4()))),
    )
    .with_notice_ttl(Duration::ZERO);

    session.save_course(&CourseDraft::new("CS101", "Intro", 3)).await;
    assert!(session.active_notices().is_empty());
    assert!(session.drain_notices().is_empty());
}
