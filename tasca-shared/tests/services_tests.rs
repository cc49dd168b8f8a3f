/// Integration tests for the domain services
///
/// These tests require a running PostgreSQL database.
/// Run with: cargo test --test services_tests -- --ignored

mod common;

use std::sync::Arc;

use bytes::Bytes;
use chrono::{Duration, Local, TimeZone, Utc};
use tasca_shared::error::ServiceError;
use tasca_shared::integrations::storage::{BlobStore, MemoryBlobStore};
use tasca_shared::models::device_token::DeviceToken;
use tasca_shared::services::devices::{register_device, DeviceRegistration};
use tasca_shared::services::pomodoro::{complete_session, daily_focus, CompletedSession};
use tasca_shared::services::profile::{update_profile, PictureUpload, ProfileAssets, ProfileUpdate};
use tasca_shared::services::tasks::{
    create_task, delete_task, get_task, set_task_completion, weekly_task_stats, NewTask,
};
use tasca_shared::services::todos::{create_todo, get_todo, update_todo, NewTodo, TodoPatch};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

fn new_task(title: &str) -> NewTask {
    NewTask {
        title: title.to_string(),
        description: None,
        priority: Some(1),
        deadline: Utc::now() + Duration::days(2),
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn test_progress_follows_task_completion() {
    let pool = common::migrated_pool().await;
    let (_, auth) = common::create_user(&pool).await;

    let todo = create_todo(&pool, &auth, NewTodo { title: "Trip".to_string(), priority: None })
        .await
        .unwrap();
    assert_eq!(todo.progress, -1);
    assert!(!todo.is_complete);

    let a = create_task(&pool, &auth, todo.id, new_task("A")).await.unwrap();
    let b = create_task(&pool, &auth, todo.id, new_task("B")).await.unwrap();
    set_task_completion(&pool, &auth, todo.id, a.id, true).await.unwrap();

    let detail = get_todo(&pool, &auth, todo.id).await.unwrap();
    assert_eq!(detail.progress, 50);
    assert!(!detail.is_complete);

    let outcome = set_task_completion(&pool, &auth, todo.id, b.id, true).await.unwrap();
    assert!(outcome.changed);
    assert!(outcome.todo_is_complete);
    assert_eq!(outcome.progress, 100);
    assert!(outcome.task.completed_at.is_some());

    let detail = get_todo(&pool, &auth, todo.id).await.unwrap();
    assert_eq!(detail.progress, 100);
    assert!(detail.is_complete);

    // A new task reopens the todo
    create_task(&pool, &auth, todo.id, new_task("C")).await.unwrap();
    let detail = get_todo(&pool, &auth, todo.id).await.unwrap();
    assert_eq!(detail.progress, 66);
    assert!(!detail.is_complete);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn test_toggle_to_current_state_writes_nothing() {
    let pool = common::migrated_pool().await;
    let (_, auth) = common::create_user(&pool).await;

    let todo = create_todo(&pool, &auth, NewTodo { title: "Chores".to_string(), priority: Some(2) })
        .await
        .unwrap();
    let task = create_task(&pool, &auth, todo.id, new_task("Dishes")).await.unwrap();

    let outcome = set_task_completion(&pool, &auth, todo.id, task.id, false).await.unwrap();
    assert!(!outcome.changed);

    let reloaded = get_task(&pool, &auth, todo.id, task.id).await.unwrap();
    assert_eq!(reloaded.updated_at, task.updated_at);
    assert!(reloaded.completed_at.is_none());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn test_foreign_todo_is_forbidden() {
    let pool = common::migrated_pool().await;
    let (_, owner) = common::create_user(&pool).await;
    let (_, intruder) = common::create_user(&pool).await;

    let todo = create_todo(&pool, &owner, NewTodo { title: "Private".to_string(), priority: None })
        .await
        .unwrap();
    let task = create_task(&pool, &owner, todo.id, new_task("Secret")).await.unwrap();

    assert!(matches!(
        get_task(&pool, &intruder, todo.id, task.id).await,
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        set_task_completion(&pool, &intruder, todo.id, task.id, true).await,
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        delete_task(&pool, &intruder, todo.id, task.id).await,
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        update_todo(&pool, &intruder, todo.id, TodoPatch::default()).await,
        Err(ServiceError::Forbidden(_))
    ));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn test_out_of_range_priority_is_rejected() {
    let pool = common::migrated_pool().await;
    let (_, auth) = common::create_user(&pool).await;

    let result = create_todo(&pool, &auth, NewTodo { title: "x".to_string(), priority: Some(9) }).await;
    assert!(matches!(result, Err(ServiceError::Validation { .. })));

    let todo = create_todo(&pool, &auth, NewTodo { title: "x".to_string(), priority: None })
        .await
        .unwrap();
    let result = create_task(
        &pool,
        &auth,
        todo.id,
        NewTask { priority: Some(-1), ..new_task("y") },
    )
    .await;
    assert!(matches!(result, Err(ServiceError::Validation { .. })));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn test_device_reregistration_updates_platform() {
    let pool = common::migrated_pool().await;
    let (user, auth) = common::create_user(&pool).await;

    let registration = |platform: &str| DeviceRegistration {
        token: "player-123".to_string(),
        platform: platform.to_string(),
    };

    register_device(&pool, &auth, registration("android")).await.unwrap();
    let before = DeviceToken::count_for_user(&pool, user.id).await.unwrap();

    let device = register_device(&pool, &auth, registration("ios")).await.unwrap();
    let after = DeviceToken::count_for_user(&pool, user.id).await.unwrap();

    assert_eq!(device.platform, "ios");
    assert_eq!(before, after);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn test_pomodoro_sessions_accumulate_per_day() {
    let pool = common::migrated_pool().await;
    let (_, auth) = common::create_user(&pool).await;

    let at = Local.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap().with_timezone(&Utc);
    complete_session(&pool, &auth, &Local, CompletedSession { duration: 25, completed_at: at })
        .await
        .unwrap();
    let recorded = complete_session(
        &pool,
        &auth,
        &Local,
        CompletedSession { duration: 15, completed_at: at + Duration::hours(2) },
    )
    .await
    .unwrap();

    assert_eq!(recorded.total_duration, 40);

    let daily = daily_focus(&pool, &auth, recorded.date).await.unwrap();
    assert_eq!(daily.total_minutes, 40);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn test_weekly_stats_count_completions() {
    let pool = common::migrated_pool().await;
    let (_, auth) = common::create_user(&pool).await;

    let todo = create_todo(&pool, &auth, NewTodo { title: "Week".to_string(), priority: None })
        .await
        .unwrap();
    let task = create_task(&pool, &auth, todo.id, new_task("Done today")).await.unwrap();
    set_task_completion(&pool, &auth, todo.id, task.id, true).await.unwrap();

    let today = Local::now().date_naive();
    let stats = weekly_task_stats(&pool, &auth, &Local, today).await.unwrap();

    assert_eq!(stats.total_tasks, 1);
    assert_eq!(stats.daily_tasks.iter().sum::<i64>(), 1);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL (set DATABASE_URL)"]
async fn test_profile_username_conflict_rolls_back_upload() {
    let pool = common::migrated_pool().await;
    let (taken, _) = common::create_user(&pool).await;
    let (_, auth) = common::create_user(&pool).await;

    let memory = Arc::new(MemoryBlobStore::new("https://cdn.example.com"));
    let store: Arc<dyn BlobStore> = memory.clone();
    let assets = ProfileAssets::new(Some(store), "nopp.png");

    let update = ProfileUpdate {
        username: Some(taken.username.clone()),
        picture: Some(PictureUpload {
            filename: "me.png".to_string(),
            bytes: Bytes::from_static(PNG),
        }),
        ..Default::default()
    };

    let result = update_profile(&pool, &auth, &assets, update).await;

    assert!(matches!(result, Err(ServiceError::Conflict(_))));
    assert!(memory.keys().is_empty(), "Uploaded picture should be removed");
}
