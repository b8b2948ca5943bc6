// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use serde_json::json;

use crate::{
    modules::{
        delivery::{mock::RecordingDelivery, DeliveryTarget},
        error::code::ErrorCode,
        scheduler::{handlers::TaskHandlers, TaskScheduler},
        store::{
            model::{Task, LIKE_SYNC_ACTION, TELEMETRY_ACTION},
            nativedb::NativeDbTaskMedium,
            TaskRepository,
        },
    },
    raise_error,
};

fn repository() -> Arc<TaskRepository<NativeDbTaskMedium>> {
    Arc::new(TaskRepository::with_opener(NativeDbTaskMedium::in_memory))
}

fn telemetry_task(retry_count: u32) -> Task {
    let mut task = Task::new(
        "Batch telemetry",
        TELEMETRY_ACTION,
        json!([{"pk": "A", "sk": "1", "actionType": "like"}]),
    );
    task.retry_count = retry_count;
    task
}

fn scheduler_with(
    store: Arc<TaskRepository<NativeDbTaskMedium>>,
    delivery: Arc<RecordingDelivery>,
) -> TaskScheduler<NativeDbTaskMedium> {
    TaskScheduler::new(store, TaskHandlers::with_delivery(delivery), 3)
}

#[tokio::test]
async fn successful_attempt_completes_task() {
    let store = repository();
    let delivery = Arc::new(RecordingDelivery::default());
    let stored = store.insert(telemetry_task(0)).await.unwrap();
    let scheduler = scheduler_with(store.clone(), delivery.clone());

    let summary = scheduler.run_tick().await.unwrap().unwrap();
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.succeeded, 1);

    let task = store.get_by_id(stored.id.unwrap()).await.unwrap().unwrap();
    assert!(task.completed);
    assert_eq!(task.retry_count, 0);
    assert!(task.updated_at >= stored.updated_at);

    let calls = delivery.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, DeliveryTarget::Telemetry);
    assert_eq!(calls[0].1, stored.payload);
    assert_eq!(store.get_incomplete_count().await.unwrap(), 0);
}

#[tokio::test]
async fn failed_attempts_count_up_to_dead_letter() {
    let store = repository();
    let delivery = Arc::new(RecordingDelivery::failing());
    let stored = store.insert(telemetry_task(0)).await.unwrap();
    let id = stored.id.unwrap();
    let scheduler = scheduler_with(store.clone(), delivery.clone());

    for expected in 1..=3 {
        scheduler.run_tick().await.unwrap();
        let task = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(task.retry_count, expected);
        assert!(!task.completed);
    }

    // exhausted: no further attempts, task stays in storage
    let summary = scheduler.run_tick().await.unwrap().unwrap();
    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(delivery.call_count(), 3);
    let task = store.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(task.retry_count, 3);
    assert_eq!(store.get_dead_letters(3).await.unwrap().len(), 1);
}

#[tokio::test]
async fn third_failure_is_reported_as_dead_letter() {
    let store = repository();
    let delivery = Arc::new(RecordingDelivery::failing());
    store.insert(telemetry_task(2)).await.unwrap();
    let scheduler = scheduler_with(store, delivery);

    let summary = scheduler.run_tick().await.unwrap().unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.dead_lettered, 1);
}

#[tokio::test]
async fn exhausted_and_completed_tasks_are_never_executed() {
    let store = repository();
    let delivery = Arc::new(RecordingDelivery::default());
    let exhausted = store.insert(telemetry_task(3)).await.unwrap();
    let mut done = telemetry_task(0);
    done.completed = true;
    let done = store.insert(done).await.unwrap();
    let scheduler = scheduler_with(store.clone(), delivery.clone());

    let summary = scheduler
        .execute_all(vec![exhausted.clone(), done.clone()])
        .await;
    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.skipped, 2);
    assert_eq!(delivery.call_count(), 0);
    assert_eq!(
        store.get_by_id(exhausted.id.unwrap()).await.unwrap(),
        Some(exhausted)
    );
}

#[tokio::test]
async fn panicking_handler_does_not_abort_the_tick() {
    let store = repository();
    let mut handlers = TaskHandlers::new();
    handlers.register("EXPLODE", |task: Task| async move {
        assert!(task.payload.is_object(), "handler blew up");
        Ok(())
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    handlers.register(TELEMETRY_ACTION, move |_task: Task| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    let exploding = store
        .insert(Task::new("boom", "EXPLODE", json!(null)))
        .await
        .unwrap();
    let fine = store.insert(telemetry_task(0)).await.unwrap();
    let scheduler = TaskScheduler::new(store.clone(), handlers, 3);

    let summary = scheduler.run_tick().await.unwrap().unwrap();
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let exploding = store.get_by_id(exploding.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(exploding.retry_count, 1);
    let fine = store.get_by_id(fine.id.unwrap()).await.unwrap().unwrap();
    assert!(fine.completed);
}

#[tokio::test]
async fn unknown_action_counts_as_failure() {
    let store = repository();
    let stored = store
        .insert(Task::new("legacy", "SOMETHING_ELSE", json!({})))
        .await
        .unwrap();
    let scheduler = TaskScheduler::new(store.clone(), TaskHandlers::new(), 3);

    let summary = scheduler.run_tick().await.unwrap().unwrap();
    assert_eq!(summary.failed, 1);
    let task = store.get_by_id(stored.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(task.retry_count, 1);
}

#[tokio::test]
async fn like_sync_tasks_go_to_the_like_endpoints() {
    let store = repository();
    let delivery = Arc::new(RecordingDelivery::default());
    store
        .insert(Task::new(
            "Unlike sync",
            LIKE_SYNC_ACTION,
            json!({"type": "UNLIKE", "payload": {"pk": "A", "sk": "1"}}),
        ))
        .await
        .unwrap();
    let scheduler = scheduler_with(store.clone(), delivery.clone());

    let summary = scheduler.run_tick().await.unwrap().unwrap();
    assert_eq!(summary.succeeded, 1);
    let calls = delivery.calls();
    assert_eq!(calls[0].0, DeliveryTarget::Unlike);
    assert_eq!(calls[0].1, json!({"pk": "A", "sk": "1"}));
}

#[tokio::test]
async fn empty_store_runs_nothing() {
    let store = repository();
    let delivery = Arc::new(RecordingDelivery::default());
    let scheduler = scheduler_with(store, delivery.clone());
    let summary = scheduler.run_tick().await.unwrap().unwrap();
    assert_eq!(summary.attempted, 0);
    assert_eq!(delivery.call_count(), 0);
}

#[tokio::test]
async fn overlapping_ticks_are_skipped() {
    let store = repository();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let release_rx = Arc::new(tokio::sync::Mutex::new(Some(release_rx)));
    let mut handlers = TaskHandlers::new();
    handlers.register(TELEMETRY_ACTION, move |_task: Task| {
        let release_rx = release_rx.clone();
        async move {
            if let Some(rx) = release_rx.lock().await.take() {
                let _ = rx.await;
            }
            Ok(())
        }
    });
    store.insert(telemetry_task(0)).await.unwrap();
    let scheduler = Arc::new(TaskScheduler::new(store, handlers, 3));

    let first = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.run_tick().await }
    });
    while !scheduler.is_running() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(scheduler.run_tick().await.unwrap().is_none());

    release_tx.send(()).unwrap();
    let summary = first.await.unwrap().unwrap().unwrap();
    assert_eq!(summary.succeeded, 1);
    assert!(!scheduler.is_running());
}

#[tokio::test]
async fn storage_failure_during_tick_still_records_outcome() {
    let store: Arc<TaskRepository<NativeDbTaskMedium>> = Arc::new(TaskRepository::with_opener(|| {
        Err(raise_error!("no disk".into(), ErrorCode::StorageUnavailable))
    }));
    let delivery = Arc::new(RecordingDelivery::default());
    let stored = store.insert(telemetry_task(0)).await.unwrap();
    let scheduler = scheduler_with(store.clone(), delivery);

    scheduler.run_tick().await.unwrap();
    let task = store.get_by_id(stored.id.unwrap()).await.unwrap().unwrap();
    assert!(task.completed);
}

#[tokio::test]
async fn periodic_loop_replays_tasks_until_cancelled() {
    let store = repository();
    let delivery = Arc::new(RecordingDelivery::default());
    let stored = store.insert(telemetry_task(0)).await.unwrap();
    let scheduler = Arc::new(scheduler_with(store.clone(), delivery.clone()));

    let handle = scheduler.start(Duration::from_millis(20));
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.cancel().await;

    let task = store.get_by_id(stored.id.unwrap()).await.unwrap().unwrap();
    assert!(task.completed);
    assert_eq!(delivery.call_count(), 1);
}

#[tokio::test]
async fn task_deleted_during_attempt_stays_deleted() {
    let store = repository();
    let mut handlers = TaskHandlers::new();
    let handler_store = store.clone();
    handlers.register(TELEMETRY_ACTION, move |task: Task| {
        let store = handler_store.clone();
        async move {
            if let Some(id) = task.id {
                store.delete_by_id(id).await?;
            }
            Err(raise_error!(
                "endpoint unreachable".into(),
                ErrorCode::NetworkError
            ))
        }
    });
    let stored = store.insert(telemetry_task(0)).await.unwrap();
    let scheduler = TaskScheduler::new(store.clone(), handlers, 3);

    let summary = scheduler.run_tick().await.unwrap().unwrap();
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.failed, 1);
    assert!(store.get_by_id(stored.id.unwrap()).await.unwrap().is_none());
    assert!(store.get_all().await.unwrap().is_empty());
}
