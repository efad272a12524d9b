//! Integration tests for course plan queries.

use serde_json::json;
use uuid::Uuid;

use semplan_db::queries::{course_plans, users};
use semplan_test_utils::{create_test_db, drop_test_db};

#[tokio::test]
async fn insert_or_get_returns_existing_plan() {
    let (pool, db_name) = create_test_db().await;
    let ada = users::get_or_create_user(&pool, "ada@example.edu").await.unwrap();

    let created = course_plans::insert_or_get_plan(&pool, ada.id, 8, &json!([]))
        .await
        .unwrap();
    assert_eq!(created.total_semesters, 8);
    assert_eq!(created.version, 1);

    let again = course_plans::insert_or_get_plan(&pool, ada.id, 4, &json!([{"id": 1}]))
        .await
        .unwrap();
    assert_eq!(again.id, created.id);
    assert_eq!(again.total_semesters, 8);
    assert_eq!(again.semesters, json!([]));

    let by_owner = course_plans::get_plan_for_owner(&pool, ada.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_owner.id, created.id);

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn every_write_bumps_version() {
    let (pool, db_name) = create_test_db().await;
    let ada = users::get_or_create_user(&pool, "ada@example.edu").await.unwrap();
    let plan = course_plans::insert_or_get_plan(&pool, ada.id, 8, &json!([]))
        .await
        .unwrap();

    let v2 = course_plans::update_plan(&pool, plan.id, 2, &json!([{"id": 1, "courseIds": []}]))
        .await
        .unwrap();
    assert_eq!(v2, Some(2));

    let v3 = course_plans::update_plan_semesters(&pool, plan.id, &json!([]))
        .await
        .unwrap();
    assert_eq!(v3, Some(3));

    let stored = course_plans::get_plan(&pool, plan.id).await.unwrap().unwrap();
    assert_eq!(stored.total_semesters, 2);
    assert_eq!(stored.version, 3);
    assert!(stored.updated_at >= stored.created_at);

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn versioned_update_checks_expected_version() {
    let (pool, db_name) = create_test_db().await;
    let ada = users::get_or_create_user(&pool, "ada@example.edu").await.unwrap();
    let plan = course_plans::insert_or_get_plan(&pool, ada.id, 8, &json!([]))
        .await
        .unwrap();

    let stale = course_plans::update_plan_if_version(&pool, plan.id, 7, 8, &json!([]))
        .await
        .unwrap();
    assert_eq!(stale, None);

    let fresh = course_plans::update_plan_if_version(&pool, plan.id, 1, 6, &json!([]))
        .await
        .unwrap();
    assert_eq!(fresh, Some(2));

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn updates_of_missing_plan_return_none() {
    let (pool, db_name) = create_test_db().await;
    let missing = Uuid::new_v4();

    assert_eq!(course_plans::update_plan(&pool, missing, 8, &json!([])).await.unwrap(), None);
    assert_eq!(
        course_plans::update_plan_semesters(&pool, missing, &json!([])).await.unwrap(),
        None
    );
    assert!(course_plans::get_plan(&pool, missing).await.unwrap().is_none());

    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn zero_semesters_violates_check() {
    let (pool, db_name) = create_test_db().await;
    let ada = users::get_or_create_user(&pool, "ada@example.edu").await.unwrap();
    let plan = course_plans::insert_or_get_plan(&pool, ada.id, 8, &json!([]))
        .await
        .unwrap();

    assert!(course_plans::update_plan(&pool, plan.id, 0, &json!([])).await.is_err());

    drop_test_db(&db_name).await;
}
