//! Integration tests for EventStore.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.
//!
//! Tests share one table and may run concurrently, so every assertion is scoped
//! to ids or payload markers created by the test itself.

use chrono::{Duration, TimeZone, Utc};
use eventlog_store::{EventPatch, EventStore, NewEventRecord, StoreError, MAX_ROWS_PER_INSERT};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

/// Get a migrated store, or skip if no test DB is available.
async fn test_store() -> Option<EventStore> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    let store = EventStore::new(pool);
    store.migrate().await.ok()?;
    Some(store)
}

// =========================================================================
// Create / read
// =========================================================================

#[tokio::test]
async fn create_then_get_round_trips_supplied_fields() {
    let Some(store) = test_store().await else {
        return;
    };
    let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    let created = store
        .create(
            NewEventRecord::new("user_login")
                .with_payload(json!({"userId": "user1"}))
                .with_created_at(at),
        )
        .await
        .unwrap();

    assert_eq!(created.event_type, "user_login");
    assert_eq!(created.created_at, at);

    let fetched = store.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.payload, Some(json!({"userId": "user1"})));
}

#[tokio::test]
async fn create_fills_id_and_timestamp_defaults() {
    let Some(store) = test_store().await else {
        return;
    };
    let before = Utc::now() - Duration::minutes(5);

    let created = store.create(NewEventRecord::new("item_viewed")).await.unwrap();

    assert!(!created.id.is_nil());
    assert!(created.payload.is_none());
    assert!(created.created_at > before);
}

#[tokio::test]
async fn create_rejects_oversized_event_type_as_validation() {
    let Some(store) = test_store().await else {
        return;
    };

    let err = store
        .create(NewEventRecord::new("x".repeat(51)))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Validation(_)), "got {err:?}");
}

#[tokio::test]
async fn list_all_includes_created_records() {
    let Some(store) = test_store().await else {
        return;
    };
    let a = store.create(NewEventRecord::new("list_a")).await.unwrap();
    let b = store.create(NewEventRecord::new("list_b")).await.unwrap();

    let all = store.list_all().await.unwrap();
    assert!(all.contains(&a));
    assert!(all.contains(&b));
}

// =========================================================================
// Not found
// =========================================================================

#[tokio::test]
async fn point_operations_on_unknown_id_are_not_found() {
    let Some(store) = test_store().await else {
        return;
    };
    let missing = Uuid::new_v4();

    assert!(matches!(
        store.get_by_id(missing).await,
        Err(StoreError::NotFound(id)) if id == missing
    ));
    assert!(store
        .update(missing, EventPatch::new().with_event_type("x"))
        .await
        .unwrap_err()
        .is_not_found());
    assert!(store.delete(missing).await.unwrap_err().is_not_found());
    assert!(store.get_all_by_id(missing).await.unwrap().is_empty());
}

// =========================================================================
// Update / delete
// =========================================================================

#[tokio::test]
async fn partial_update_changes_only_supplied_fields() {
    let Some(store) = test_store().await else {
        return;
    };
    let at = Utc.with_ymd_and_hms(2025, 2, 10, 12, 30, 0).unwrap();
    let created = store
        .create(
            NewEventRecord::new("user_login")
                .with_payload(json!({"userId": "user2"}))
                .with_created_at(at),
        )
        .await
        .unwrap();

    let updated = store
        .update(created.id, EventPatch::new().with_payload(json!({"userId": "user99"})))
        .await
        .unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.event_type, "user_login");
    assert_eq!(updated.created_at, at);
    assert_eq!(updated.payload, Some(json!({"userId": "user99"})));
    assert_eq!(store.get_by_id(created.id).await.unwrap(), updated);
}

#[tokio::test]
async fn empty_patch_returns_current_row() {
    let Some(store) = test_store().await else {
        return;
    };
    let created = store.create(NewEventRecord::new("noop")).await.unwrap();

    let same = store.update(created.id, EventPatch::new()).await.unwrap();
    assert_eq!(same, created);
}

#[tokio::test]
async fn delete_is_final() {
    let Some(store) = test_store().await else {
        return;
    };
    let created = store.create(NewEventRecord::new("doomed")).await.unwrap();

    store.delete(created.id).await.unwrap();

    assert!(store.get_by_id(created.id).await.unwrap_err().is_not_found());
    assert!(store.delete(created.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn update_can_move_created_at() {
    let Some(store) = test_store().await else {
        return;
    };
    let at = Utc.with_ymd_and_hms(2025, 1, 20, 6, 0, 0).unwrap();
    let moved = Utc.with_ymd_and_hms(2025, 2, 21, 7, 15, 0).unwrap();
    let created = store
        .create(
            NewEventRecord::new("user_login")
                .with_payload(json!({"userId": "user5"}))
                .with_created_at(at),
        )
        .await
        .unwrap();

    let updated = store
        .update(created.id, EventPatch::new().with_created_at(moved))
        .await
        .unwrap();

    assert_eq!(updated.created_at, moved);
    assert_eq!(updated.event_type, "user_login");
    assert_eq!(updated.payload, Some(json!({"userId": "user5"})));
    assert_eq!(store.get_all_by_id(created.id).await.unwrap(), vec![updated]);
}

// =========================================================================
// Composite key (id, created_at)
// =========================================================================

#[tokio::test]
async fn rows_sharing_an_id_coexist_and_most_recent_wins() {
    let Some(store) = test_store().await else {
        return;
    };
    let id = Uuid::new_v4();
    let older = Utc.with_ymd_and_hms(2025, 1, 5, 8, 0, 0).unwrap();
    let newer = Utc.with_ymd_and_hms(2025, 4, 5, 8, 0, 0).unwrap();

    // Insert the newer one first so scan order and timestamp order disagree.
    store
        .create(NewEventRecord::new("second").with_id(id).with_created_at(newer))
        .await
        .unwrap();
    store
        .create(NewEventRecord::new("first").with_id(id).with_created_at(older))
        .await
        .unwrap();

    let all = store.list_all().await.unwrap();
    assert_eq!(all.iter().filter(|r| r.id == id).count(), 2);

    let matches = store.get_all_by_id(id).await.unwrap();
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].created_at, older);
    assert_eq!(matches[1].created_at, newer);

    let picked = store.get_by_id(id).await.unwrap();
    assert_eq!(picked.event_type, "second");
    assert_eq!(picked.created_at, newer);
}

#[tokio::test]
async fn duplicate_composite_key_is_rejected() {
    let Some(store) = test_store().await else {
        return;
    };
    let id = Uuid::new_v4();
    let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

    store
        .create(NewEventRecord::new("dup").with_id(id).with_created_at(at))
        .await
        .unwrap();
    let err = store
        .create(NewEventRecord::new("dup").with_id(id).with_created_at(at))
        .await
        .unwrap_err();

    assert!(err.is_validation(), "got {err:?}");
}

#[tokio::test]
async fn update_and_delete_apply_to_every_row_sharing_an_id() {
    let Some(store) = test_store().await else {
        return;
    };
    let id = Uuid::new_v4();
    for day in [1, 2, 3] {
        store
            .create(
                NewEventRecord::new("multi")
                    .with_id(id)
                    .with_created_at(Utc.with_ymd_and_hms(2025, 3, day, 0, 0, 0).unwrap()),
            )
            .await
            .unwrap();
    }

    let updated = store
        .update(id, EventPatch::new().with_event_type("multi_renamed"))
        .await
        .unwrap();
    assert_eq!(updated.created_at, Utc.with_ymd_and_hms(2025, 3, 3, 0, 0, 0).unwrap());

    let matches = store.get_all_by_id(id).await.unwrap();
    assert_eq!(matches.len(), 3);
    assert!(matches.iter().all(|r| r.event_type == "multi_renamed"));

    store.delete(id).await.unwrap();
    assert!(store.get_all_by_id(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn moving_created_at_on_shared_id_collides_and_changes_nothing() {
    let Some(store) = test_store().await else {
        return;
    };
    let id = Uuid::new_v4();
    let first = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
    let second = Utc.with_ymd_and_hms(2025, 3, 2, 0, 0, 0).unwrap();
    for at in [first, second] {
        store
            .create(NewEventRecord::new("shared").with_id(id).with_created_at(at))
            .await
            .unwrap();
    }
    let before = store.get_all_by_id(id).await.unwrap();

    let err = store
        .update(
            id,
            EventPatch::new()
                .with_event_type("renamed")
                .with_created_at(Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap()),
        )
        .await
        .unwrap_err();

    assert!(err.is_validation(), "got {err:?}");
    assert_eq!(store.get_all_by_id(id).await.unwrap(), before);
    assert_eq!(before.len(), 2);
}

// =========================================================================
// Bulk insert
// =========================================================================

#[tokio::test]
async fn insert_many_writes_every_row() {
    let Some(store) = test_store().await else {
        return;
    };
    let marker = Uuid::new_v4().to_string();
    let batch: Vec<_> = (0..25)
        .map(|i| NewEventRecord::new("bulk").with_payload(json!({"marker": marker, "n": i})))
        .collect();

    let inserted = store.insert_many(&batch).await.unwrap();
    assert_eq!(inserted, 25);

    let all = store.list_all().await.unwrap();
    let ours = all
        .iter()
        .filter(|r| r.payload.as_ref().and_then(|p| p.get("marker")) == Some(&json!(marker)))
        .count();
    assert_eq!(ours, 25);
}

#[tokio::test]
async fn insert_many_is_all_or_nothing() {
    let Some(store) = test_store().await else {
        return;
    };
    let marker = Uuid::new_v4().to_string();
    let mut batch: Vec<_> = (0..10)
        .map(|i| NewEventRecord::new("bulk").with_payload(json!({"marker": marker, "n": i})))
        .collect();
    batch[7].event_type = "y".repeat(60);

    let err = store.insert_many(&batch).await.unwrap_err();
    assert!(err.is_validation(), "got {err:?}");

    let all = store.list_all().await.unwrap();
    assert!(!all
        .iter()
        .any(|r| r.payload.as_ref().and_then(|p| p.get("marker")) == Some(&json!(marker))));
}

#[tokio::test]
async fn insert_many_fits_the_largest_batch_in_one_statement() {
    let Some(store) = test_store().await else {
        return;
    };
    let marker = Uuid::new_v4().to_string();
    let batch: Vec<_> = (0..MAX_ROWS_PER_INSERT)
        .map(|_| NewEventRecord::new("bulk_max").with_payload(json!({"marker": marker})))
        .collect();

    let inserted = store.insert_many(&batch).await.unwrap();
    assert_eq!(inserted, MAX_ROWS_PER_INSERT as u64);
}

#[tokio::test]
async fn insert_many_with_no_rows_is_a_noop() {
    let Some(store) = test_store().await else {
        return;
    };
    assert_eq!(store.insert_many(&[]).await.unwrap(), 0);
}
