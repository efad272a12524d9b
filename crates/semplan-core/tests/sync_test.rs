//! Synchronizer behaviour against the in-memory store.

use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;

use semplan_core::plan::{DEFAULT_SEMESTER_COUNT, add_course};
use semplan_core::{
    ConflictPolicy, CourseDraft, CourseId, MemoryStore, OwnerId, PlanError, PlanId, PlanRecord,
    PlanSynchronizer, StoreError,
};

fn owner() -> OwnerId {
    OwnerId(Uuid::new_v4())
}

fn synchronizer(store: &Arc<MemoryStore>) -> PlanSynchronizer {
    PlanSynchronizer::new(store.clone())
}

async fn seed_plan(
    store: &MemoryStore,
    owner: OwnerId,
    total: i32,
    semesters: serde_json::Value,
) -> PlanId {
    let id = PlanId(Uuid::new_v4());
    store
        .put_plan_record(PlanRecord {
            id,
            owner_id: owner,
            total_semesters: total,
            semesters,
            version: 1,
        })
        .await;
    id
}

#[tokio::test]
async fn first_load_creates_default_plan() {
    let store = Arc::new(MemoryStore::new());
    let owner = owner();

    let plan = synchronizer(&store).load(owner).await.unwrap();

    assert_eq!(plan.total_semesters, DEFAULT_SEMESTER_COUNT);
    assert_eq!(plan.semesters.len(), 8);
    assert!(plan.semesters.iter().all(|s| s.is_empty()));

    // Persisted before returning.
    let record = store.plan_record(owner).await.unwrap();
    assert_eq!(record.id, plan.id);
    assert_eq!(record.total_semesters, 8);
    assert_eq!(record.semesters.as_array().map(Vec::len), Some(8));
}

#[tokio::test]
async fn second_load_reuses_the_plan() {
    let store = Arc::new(MemoryStore::new());
    let owner = owner();
    let sync = synchronizer(&store);

    let first = sync.load(owner).await.unwrap();
    let second = sync.load(owner).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(store.write_count().await, 1);
}

#[tokio::test]
async fn legacy_plan_is_healed_on_load() {
    let store = Arc::new(MemoryStore::new());
    let owner = owner();
    seed_plan(
        &store,
        owner,
        1,
        json!([{"id": 1, "courses": [{"id": "X", "code": "CS1"}]}]),
    )
    .await;

    let plan = synchronizer(&store).load(owner).await.unwrap();

    assert_eq!(plan.semesters[0].course_ids, vec![CourseId::from("X")]);
    let record = store.plan_record(owner).await.unwrap();
    assert_eq!(record.semesters, json!([{"id": 1, "courseIds": ["X"]}]));
    assert_eq!(record.version, 2);
    assert_eq!(plan.version, 2);
}

#[tokio::test]
async fn gapped_semester_ids_are_renumbered_and_written_back() {
    let store = Arc::new(MemoryStore::new());
    let owner = owner();
    seed_plan(
        &store,
        owner,
        3,
        json!(["garbage", {"id": 1, "courseIds": []}, {"id": 3, "courseIds": ["A"]}]),
    )
    .await;

    let sync = synchronizer(&store);
    let plan = sync.load(owner).await.unwrap();
    assert!(plan.invariant_violations().is_empty(), "{:?}", plan.invariant_violations());

    let plan = add_course(&plan, 2, &CourseId::from("B")).unwrap();
    sync.commit(&plan).await.unwrap();

    let record = store.plan_record(owner).await.unwrap();
    assert_eq!(
        record.semesters,
        json!([
            {"id": 1, "courseIds": []},
            {"id": 2, "courseIds": ["B"]},
            {"id": 3, "courseIds": ["A"]},
        ])
    );
}

#[tokio::test]
async fn canonical_plan_is_not_rewritten() {
    let store = Arc::new(MemoryStore::new());
    let owner = owner();
    let canonical = json!([{"id": 1, "courseIds": ["A"]}, {"id": 2, "courseIds": []}]);
    seed_plan(&store, owner, 2, canonical).await;

    synchronizer(&store).load(owner).await.unwrap();

    assert_eq!(store.write_count().await, 0);
}

#[tokio::test]
async fn failed_heal_still_returns_canonical_plan() {
    let store = Arc::new(MemoryStore::new());
    let owner = owner();
    let raw = json!([{"id": 1, "courses": [{"id": "X"}]}]);
    seed_plan(&store, owner, 1, raw.clone()).await;
    store.fail_next_writes(1).await;

    let plan = synchronizer(&store).load(owner).await.unwrap();

    assert_eq!(plan.semesters[0].course_ids, vec![CourseId::from("X")]);
    // Not retried within the same load.
    assert_eq!(store.plan_record(owner).await.unwrap().semesters, raw);
}

#[tokio::test]
async fn load_failure_surfaces_as_store_unavailable() {
    let store = Arc::new(MemoryStore::new());
    store.fail_next_reads(1).await;

    assert_matches!(
        synchronizer(&store).load(owner()).await,
        Err(PlanError::StoreUnavailable(StoreError::Unavailable(_)))
    );
}

#[tokio::test]
async fn commit_writes_by_plan_id() {
    let store = Arc::new(MemoryStore::new());
    let owner = owner();
    let sync = synchronizer(&store);

    let plan = sync.load(owner).await.unwrap();
    let next = add_course(&plan, 3, &CourseId::from("CS101")).unwrap();
    let committed = sync.commit(&next).await.unwrap();

    assert_eq!(committed.version, plan.version + 1);
    let record = store.plan_record(owner).await.unwrap();
    assert_eq!(record.semesters[2], json!({"id": 3, "courseIds": ["CS101"]}));
}

#[tokio::test]
async fn last_writer_wins_by_default() {
    let store = Arc::new(MemoryStore::new());
    let owner = owner();
    let sync = synchronizer(&store);

    let base = sync.load(owner).await.unwrap();
    let first = add_course(&base, 1, &CourseId::from("A")).unwrap();
    let second = add_course(&base, 2, &CourseId::from("B")).unwrap();
    sync.commit(&first).await.unwrap();
    sync.commit(&second).await.unwrap();

    let stored = sync.load(owner).await.unwrap();
    assert!(!stored.contains(&CourseId::from("A")));
    assert!(stored.contains(&CourseId::from("B")));
}

#[tokio::test]
async fn reject_stale_refuses_outdated_commit() {
    let store = Arc::new(MemoryStore::new());
    let owner = owner();
    let sync = synchronizer(&store).with_policy(ConflictPolicy::RejectStale);

    let base = sync.load(owner).await.unwrap();
    let first = add_course(&base, 1, &CourseId::from("A")).unwrap();
    let second = add_course(&base, 2, &CourseId::from("B")).unwrap();
    sync.commit(&first).await.unwrap();

    assert_matches!(
        sync.commit(&second).await,
        Err(PlanError::StaleWrite { expected, .. }) if expected == base.version
    );
}

#[tokio::test]
async fn catalog_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let owner = owner();
    let sync = synchronizer(&store);

    let draft = CourseDraft::new(" CS201 ", "Data Structures", 4)
        .required(true)
        .prerequisite("CS101");
    let saved = sync.save_course(owner, &draft).await.unwrap();
    assert_eq!(saved.code, "CS201");

    let catalog = sync.reconcile_catalog(owner).await.unwrap();
    assert_eq!(catalog.len(), 1);

    let edited = sync
        .update_course_field(&catalog, &saved.id, "grade", "A")
        .await
        .unwrap();
    assert_eq!(edited.get(&saved.id).unwrap().grade.as_deref(), Some("A"));
    let reloaded = sync.reconcile_catalog(owner).await.unwrap();
    assert_eq!(reloaded.get(&saved.id).unwrap().grade.as_deref(), Some("A"));
}

#[tokio::test]
async fn invalid_draft_never_reaches_the_store() {
    let store = Arc::new(MemoryStore::new());
    let sync = synchronizer(&store);

    assert_matches!(
        sync.save_course(owner(), &CourseDraft::new("CS1", "Intro", 0)).await,
        Err(PlanError::InvalidCourse(_))
    );
    assert_eq!(store.write_count().await, 0);
}

#[tokio::test]
async fn non_editable_field_never_reaches_the_store() {
    let store = Arc::new(MemoryStore::new());
    let owner = owner();
    let sync = synchronizer(&store);
    let saved = sync
        .save_course(owner, &CourseDraft::new("CS1", "Intro", 3))
        .await
        .unwrap();
    let catalog = sync.reconcile_catalog(owner).await.unwrap();
    let writes = store.write_count().await;

    assert_matches!(
        sync.update_course_field(&catalog, &saved.id, "credits", "5").await,
        Err(PlanError::FieldNotEditable(field)) if field == "credits"
    );
    assert_eq!(store.write_count().await, writes);
}
