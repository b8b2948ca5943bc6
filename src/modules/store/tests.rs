// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use serde_json::json;

use crate::{
    modules::{
        error::{code::ErrorCode, RelayResult},
        store::{
            entity::TaskEntity,
            medium::TaskMedium,
            model::{Task, LIKE_SYNC_ACTION, TELEMETRY_ACTION},
            nativedb::NativeDbTaskMedium,
            Availability, BackendKind, TaskRepository,
        },
    },
    raise_error,
};

/// Delegates to an in-memory database until told to fail.
#[derive(Clone)]
struct FlakyMedium {
    inner: NativeDbTaskMedium,
    failing: Arc<AtomicBool>,
}

impl FlakyMedium {
    fn new(failing: Arc<AtomicBool>) -> Self {
        Self {
            inner: NativeDbTaskMedium::in_memory().unwrap(),
            failing,
        }
    }

    fn check(&self) -> RelayResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(raise_error!(
                "simulated disk failure".into(),
                ErrorCode::StorageUnavailable
            ));
        }
        Ok(())
    }
}

impl TaskMedium for FlakyMedium {
    async fn insert(&self, task: Task) -> RelayResult<Task> {
        self.check()?;
        self.inner.insert(task).await
    }

    async fn insert_many(&self, tasks: Vec<Task>) -> RelayResult<Vec<Task>> {
        self.check()?;
        self.inner.insert_many(tasks).await
    }

    async fn get_all(&self) -> RelayResult<Vec<Task>> {
        self.check()?;
        self.inner.get_all().await
    }

    async fn get_by_id(&self, id: u64) -> RelayResult<Option<Task>> {
        self.check()?;
        self.inner.get_by_id(id).await
    }

    async fn delete_by_id(&self, id: u64) -> RelayResult<()> {
        self.check()?;
        self.inner.delete_by_id(id).await
    }

    async fn incomplete_count(&self) -> RelayResult<usize> {
        self.check()?;
        self.inner.incomplete_count().await
    }

    async fn get_incomplete(&self) -> RelayResult<Vec<Task>> {
        self.check()?;
        self.inner.get_incomplete().await
    }

    async fn get_by_action(&self, action_name: String) -> RelayResult<Vec<Task>> {
        self.check()?;
        self.inner.get_by_action(action_name).await
    }

    async fn purge_completed(&self) -> RelayResult<usize> {
        self.check()?;
        self.inner.purge_completed().await
    }
}

fn in_memory_repository() -> TaskRepository<NativeDbTaskMedium> {
    TaskRepository::with_opener(NativeDbTaskMedium::in_memory)
}

fn telemetry_task() -> Task {
    Task::new(
        "Batch telemetry",
        TELEMETRY_ACTION,
        json!([{"pk": "A", "sk": "1", "actionType": "like"}]),
    )
}

#[tokio::test]
async fn insert_assigns_id_and_round_trips() {
    let repository = in_memory_repository();
    let stored = repository.insert(telemetry_task()).await.unwrap();
    let id = stored.id.unwrap();
    assert_eq!(id, 1);

    let loaded = repository.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(loaded, stored);
    assert_eq!(repository.availability().await, Availability::Available);
    assert_eq!(repository.backend_kind().await, BackendKind::Durable);
}

#[tokio::test]
async fn durable_ids_increase() {
    let repository = in_memory_repository();
    let first = repository.insert(telemetry_task()).await.unwrap();
    let second = repository.insert(telemetry_task()).await.unwrap();
    assert!(second.id.unwrap() > first.id.unwrap());
    assert_eq!(repository.get_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn update_overwrites_existing_task() {
    let repository = in_memory_repository();
    let mut task = repository.insert(telemetry_task()).await.unwrap();
    task.retry_count = 2;
    task.touch();
    repository.update(task.clone()).await.unwrap();

    let all = repository.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].retry_count, 2);
}

#[tokio::test]
async fn incomplete_queries_skip_completed_tasks() {
    let repository = in_memory_repository();
    let mut done = repository.insert(telemetry_task()).await.unwrap();
    done.completed = true;
    repository.update(done).await.unwrap();
    repository.insert(telemetry_task()).await.unwrap();
    repository.insert(telemetry_task()).await.unwrap();

    assert_eq!(repository.get_incomplete_count().await.unwrap(), 2);
    let incomplete = repository.get_incomplete().await.unwrap();
    assert_eq!(incomplete.len(), 2);
    assert!(incomplete.iter().all(|task| !task.completed));
}

#[tokio::test]
async fn get_by_action_matches_exact_names() {
    let repository = in_memory_repository();
    repository.insert(telemetry_task()).await.unwrap();
    repository
        .insert(Task::new("like sync", LIKE_SYNC_ACTION, json!({"pk": "A"})))
        .await
        .unwrap();
    repository
        .insert(Task::new("prefix", "TELEMETRY_V2", json!(null)))
        .await
        .unwrap();

    let telemetry = repository.get_by_action(TELEMETRY_ACTION).await.unwrap();
    assert_eq!(telemetry.len(), 1);
    assert_eq!(telemetry[0].action_name, TELEMETRY_ACTION);
    assert!(repository.get_by_action("UNKNOWN").await.unwrap().is_empty());
}

#[tokio::test]
async fn purge_completed_removes_only_completed() {
    let repository = in_memory_repository();
    for completed in [true, false, true] {
        let mut task = telemetry_task();
        task.completed = completed;
        repository.insert(task).await.unwrap();
    }
    let mut exhausted = telemetry_task();
    exhausted.retry_count = 3;
    repository.insert(exhausted).await.unwrap();

    assert_eq!(repository.purge_completed().await.unwrap(), 2);
    let remaining = repository.get_all().await.unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|task| !task.completed));
    assert_eq!(repository.get_dead_letters(3).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let repository = in_memory_repository();
    let stored = repository.insert(telemetry_task()).await.unwrap();
    let id = stored.id.unwrap();
    repository.delete_by_id(id).await.unwrap();
    repository.delete_by_id(id).await.unwrap();
    repository.delete_by_id(9999).await.unwrap();
    assert!(repository.get_by_id(id).await.unwrap().is_none());
}

#[tokio::test]
async fn volatile_repository_round_trips() {
    let repository: TaskRepository<NativeDbTaskMedium> = TaskRepository::volatile();
    let first = repository.insert(telemetry_task()).await.unwrap();
    let second = repository.insert(telemetry_task()).await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(
        repository.get_by_id(first.id.unwrap()).await.unwrap(),
        Some(first)
    );
    assert_eq!(repository.availability().await, Availability::Unavailable);
    assert_eq!(repository.backend_kind().await, BackendKind::Volatile);
}

#[tokio::test]
async fn failed_open_falls_back_to_memory() {
    let repository: TaskRepository<NativeDbTaskMedium> = TaskRepository::with_opener(|| {
        Err(raise_error!(
            "disk is read-only".into(),
            ErrorCode::StorageUnavailable
        ))
    });
    assert_eq!(repository.availability().await, Availability::Unverified);
    assert_eq!(repository.open().await, Availability::Unavailable);

    let stored = repository.insert(telemetry_task()).await.unwrap();
    assert!(stored.id.is_some());
    assert_eq!(repository.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn open_is_attempted_once() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let repository = TaskRepository::with_opener(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        NativeDbTaskMedium::in_memory()
    });
    assert_eq!(repository.open().await, Availability::Available);
    assert_eq!(repository.open().await, Availability::Available);
    repository.get_all().await.unwrap();
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn durable_failure_downgrades_and_serves_from_memory() {
    let failing = Arc::new(AtomicBool::new(false));
    let medium = FlakyMedium::new(failing.clone());
    let repository = TaskRepository::with_opener(move || Ok(medium.clone()));

    repository.insert(telemetry_task()).await.unwrap();
    assert_eq!(repository.availability().await, Availability::Available);

    failing.store(true, Ordering::SeqCst);
    let stored = repository.insert(telemetry_task()).await.unwrap();
    assert_eq!(repository.availability().await, Availability::Unavailable);

    // the medium recovering does not switch the store back on its own
    failing.store(false, Ordering::SeqCst);
    let all = repository.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, stored.id);
    assert_eq!(repository.availability().await, Availability::Unavailable);
}

#[tokio::test]
async fn reopen_migrates_memory_tasks() {
    let failing = Arc::new(AtomicBool::new(true));
    let medium = FlakyMedium::new(failing.clone());
    let repository = TaskRepository::with_opener(move || Ok(medium.clone()));

    repository.insert(telemetry_task()).await.unwrap();
    repository.insert(telemetry_task()).await.unwrap();
    assert_eq!(repository.availability().await, Availability::Unavailable);

    failing.store(false, Ordering::SeqCst);
    assert_eq!(repository.reopen().await, Availability::Available);
    let all = repository.get_all().await.unwrap();
    assert_eq!(all.len(), 2);
    let mut ids: Vec<u64> = all.iter().filter_map(|task| task.id).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn reopen_keeps_memory_when_medium_still_fails() {
    let failing = Arc::new(AtomicBool::new(true));
    let medium = FlakyMedium::new(failing.clone());
    let repository = TaskRepository::with_opener(move || Ok(medium.clone()));

    repository.insert(telemetry_task()).await.unwrap();
    assert_eq!(repository.reopen().await, Availability::Unavailable);
    assert_eq!(repository.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn on_disk_tasks_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.db");

    let repository = TaskRepository::on_disk(path.clone());
    let stored = repository.insert(telemetry_task()).await.unwrap();
    drop(repository);

    let repository = TaskRepository::on_disk(path);
    let loaded = repository
        .get_by_id(stored.id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded, stored);
}

#[test]
fn entity_with_broken_columns_still_loads() {
    let entity = TaskEntity {
        id: 7,
        description: None,
        action_name: Some(TELEMETRY_ACTION.into()),
        payload: Some("{not json".into()),
        completed: Some(1),
        retry_count: None,
        created_at: Some("not a date".into()),
        updated_at: None,
    };
    let task: Task = entity.into();
    assert_eq!(task.id, Some(7));
    assert_eq!(task.payload, json!("{not json"));
    assert!(task.completed);
    assert_eq!(task.retry_count, 0);
    assert_eq!(task.created_at.timestamp(), 0);
}

#[test]
fn entity_state_follows_completed_flag() {
    let task = telemetry_task();
    let entity = TaskEntity::from_task(&task, 3).unwrap();
    assert_eq!(entity.state(), 0);
    assert_eq!(entity.action_key(), TELEMETRY_ACTION);
    let back: Task = entity.into();
    assert_eq!(back.payload, task.payload);
    assert_eq!(back.created_at, task.created_at);
}

#[tokio::test]
async fn update_if_present_skips_deleted_task() {
    for repository in [in_memory_repository(), TaskRepository::volatile()] {
        let mut task = repository.insert(telemetry_task()).await.unwrap();
        let id = task.id.unwrap();
        repository.delete_by_id(id).await.unwrap();

        task.retry_count = 1;
        assert!(repository.update_if_present(task).await.unwrap().is_none());
        assert!(repository.get_by_id(id).await.unwrap().is_none());
        assert!(repository.get_all().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn update_if_present_never_lowers_retry_count() {
    let repository = in_memory_repository();
    let mut stale = repository.insert(telemetry_task()).await.unwrap();
    let mut current = stale.clone();
    current.retry_count = 2;
    repository.update(current).await.unwrap();

    stale.retry_count = 1;
    stale.completed = true;
    let written = repository.update_if_present(stale).await.unwrap().unwrap();
    assert_eq!(written.retry_count, 2);
    assert!(written.completed);

    let loaded = repository.get_by_id(written.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(loaded.retry_count, 2);
}

#[test]
fn task_json_uses_camel_case_and_rfc3339_timestamps() {
    let task = telemetry_task();
    let encoded = serde_json::to_value(&task).unwrap();
    assert_eq!(encoded["actionName"], TELEMETRY_ACTION);
    assert_eq!(encoded["retryCount"], 0);
    let created_at = encoded["createdAt"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(created_at).is_ok());

    let decoded: Task = serde_json::from_value(encoded).unwrap();
    assert_eq!(decoded, task);
}
