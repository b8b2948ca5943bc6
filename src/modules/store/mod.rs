// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use poem_openapi::Enum;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::raise_error;
use crate::modules::{
    error::{code::ErrorCode, RelayResult},
    metrics::RELAY_STORAGE_FALLBACK_TOTAL,
    store::{medium::TaskMedium, memory::VolatileTasks, model::Task, nativedb::NativeDbTaskMedium},
};

pub mod entity;
pub mod medium;
pub mod memory;
pub mod model;
pub mod nativedb;
#[cfg(test)]
mod tests;

/// Whether the durable medium is in use.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Enum)]
pub enum Availability {
    /// Nothing has touched the store yet.
    Unverified,
    Available,
    /// Tasks are kept in memory until a successful reopen.
    Unavailable,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Enum)]
pub enum BackendKind {
    Unverified,
    Durable,
    Volatile,
}

enum Backend<M> {
    Unverified,
    Durable(M),
    Volatile(VolatileTasks),
}

impl<M> Backend<M> {
    fn availability(&self) -> Availability {
        match self {
            Backend::Unverified => Availability::Unverified,
            Backend::Durable(_) => Availability::Available,
            Backend::Volatile(_) => Availability::Unavailable,
        }
    }

    fn kind(&self) -> BackendKind {
        match self {
            Backend::Unverified => BackendKind::Unverified,
            Backend::Durable(_) => BackendKind::Durable,
            Backend::Volatile(_) => BackendKind::Volatile,
        }
    }

    /// Switches to the volatile list, keeping it if already active.
    fn volatile(&mut self) -> &mut VolatileTasks {
        if !matches!(self, Backend::Volatile(_)) {
            *self = Backend::Volatile(VolatileTasks::default());
        }
        match self {
            Backend::Volatile(tasks) => tasks,
            Backend::Unverified | Backend::Durable(_) => unreachable!("backend was just downgraded"),
        }
    }
}

type Opener<M> = Arc<dyn Fn() -> RelayResult<M> + Send + Sync>;

/// Task store that prefers a durable medium and falls back to memory.
///
/// The medium is opened lazily on first use. The first durable error of any
/// operation downgrades the repository to a volatile list for the rest of the
/// process, or until [`TaskRepository::reopen`] succeeds. The failing operation
/// itself is served by the volatile list, so callers never see storage errors.
pub struct TaskRepository<M: TaskMedium = NativeDbTaskMedium> {
    opener: Option<Opener<M>>,
    backend: Mutex<Backend<M>>,
}

impl TaskRepository<NativeDbTaskMedium> {
    pub fn on_disk(path: PathBuf) -> Self {
        Self::with_opener(move || NativeDbTaskMedium::open(&path))
    }
}

impl<M: TaskMedium> TaskRepository<M> {
    pub fn with_opener(opener: impl Fn() -> RelayResult<M> + Send + Sync + 'static) -> Self {
        Self {
            opener: Some(Arc::new(opener)),
            backend: Mutex::new(Backend::Unverified),
        }
    }

    /// A repository that never touches durable storage.
    pub fn volatile() -> Self {
        Self {
            opener: None,
            backend: Mutex::new(Backend::Volatile(VolatileTasks::default())),
        }
    }

    async fn open_medium(&self) -> Option<RelayResult<M>> {
        let opener = self.opener.clone()?;
        Some(match tokio::task::spawn_blocking(move || opener()).await {
            Ok(result) => result,
            Err(e) => Err(raise_error!(
                format!("task database opener panicked: {:#?}", e),
                ErrorCode::StorageUnavailable
            )),
        })
    }

    async fn ensure_open(&self, backend: &mut Backend<M>) {
        if !matches!(backend, Backend::Unverified) {
            return;
        }
        match self.open_medium().await {
            Some(Ok(medium)) => {
                info!("Task store is using the durable backend");
                *backend = Backend::Durable(medium);
            }
            Some(Err(e)) => {
                warn!(
                    "Task database could not be opened, keeping tasks in memory: {}",
                    e
                );
                RELAY_STORAGE_FALLBACK_TOTAL.inc();
                backend.volatile();
            }
            None => {
                info!("Task store is running in memory-only mode");
                backend.volatile();
            }
        }
    }

    /// Runs `durable` against the medium, or `volatile` when the medium is
    /// unavailable or has just failed.
    async fn run<T, D, F, V>(&self, operation: &str, durable: D, volatile: V) -> RelayResult<T>
    where
        D: FnOnce(M) -> F,
        F: Future<Output = RelayResult<T>>,
        V: FnOnce(&mut VolatileTasks) -> T,
    {
        let mut backend = self.backend.lock().await;
        self.ensure_open(&mut backend).await;
        if let Backend::Durable(medium) = &*backend {
            match durable(medium.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        "Task store '{}' failed on the durable backend, switching to memory: {}",
                        operation, e
                    );
                    RELAY_STORAGE_FALLBACK_TOTAL.inc();
                }
            }
        }
        Ok(volatile(backend.volatile()))
    }

    /// Opens the durable medium if that has not been tried yet.
    pub async fn open(&self) -> Availability {
        let mut backend = self.backend.lock().await;
        self.ensure_open(&mut backend).await;
        backend.availability()
    }

    /// Retries the durable medium after a downgrade. Tasks collected in memory
    /// meanwhile are moved into it in one transaction and receive new ids.
    pub async fn reopen(&self) -> Availability {
        let mut backend = self.backend.lock().await;
        match backend.kind() {
            BackendKind::Durable => return Availability::Available,
            BackendKind::Unverified => {
                self.ensure_open(&mut backend).await;
                return backend.availability();
            }
            BackendKind::Volatile => {}
        }

        let medium = match self.open_medium().await {
            Some(Ok(medium)) => medium,
            Some(Err(e)) => {
                warn!("Task database reopen failed, staying in memory: {}", e);
                return backend.availability();
            }
            None => {
                warn!("Task store is in memory-only mode, reopen skipped");
                return backend.availability();
            }
        };

        let pending: Vec<Task> = backend
            .volatile()
            .get_all()
            .into_iter()
            .map(|mut task| {
                task.id = None;
                task
            })
            .collect();
        let migrated = pending.len();
        if !pending.is_empty() {
            if let Err(e) = medium.insert_many(pending).await {
                error!(
                    "Failed to migrate {} in-memory tasks into the task database: {}",
                    migrated, e
                );
                return backend.availability();
            }
        }
        info!(
            "Task database reopened, {} in-memory tasks migrated",
            migrated
        );
        *backend = Backend::Durable(medium);
        backend.availability()
    }

    pub async fn availability(&self) -> Availability {
        self.backend.lock().await.availability()
    }

    pub async fn backend_kind(&self) -> BackendKind {
        self.backend.lock().await.kind()
    }

    /// Writes or overwrites a task and returns it with its id.
    pub async fn insert(&self, task: Task) -> RelayResult<Task> {
        let durable_task = task.clone();
        self.run(
            "insert",
            |medium| async move { medium.insert(durable_task).await },
            move |tasks| tasks.insert(task),
        )
        .await
    }

    pub async fn update(&self, task: Task) -> RelayResult<Task> {
        self.insert(task).await
    }

    /// Writes `task` back only if it is still stored. The stored retry count
    /// is never lowered. Returns `None` when the task was deleted meanwhile.
    pub async fn update_if_present(&self, task: Task) -> RelayResult<Option<Task>> {
        let Some(id) = task.id else {
            return Ok(None);
        };
        let durable_task = task.clone();
        self.run(
            "update_if_present",
            |medium| async move {
                match medium.get_by_id(id).await? {
                    Some(stored) => medium
                        .insert(merge_retry_count(durable_task, &stored))
                        .await
                        .map(Some),
                    None => Ok(None),
                }
            },
            move |tasks| {
                tasks
                    .get_by_id(id)
                    .map(|stored| tasks.insert(merge_retry_count(task, &stored)))
            },
        )
        .await
    }

    pub async fn get_all(&self) -> RelayResult<Vec<Task>> {
        self.run(
            "get_all",
            |medium| async move { medium.get_all().await },
            |tasks| tasks.get_all(),
        )
        .await
    }

    pub async fn get_by_id(&self, id: u64) -> RelayResult<Option<Task>> {
        self.run(
            "get_by_id",
            |medium| async move { medium.get_by_id(id).await },
            |tasks| tasks.get_by_id(id),
        )
        .await
    }

    pub async fn delete_by_id(&self, id: u64) -> RelayResult<()> {
        self.run(
            "delete_by_id",
            |medium| async move { medium.delete_by_id(id).await },
            |tasks| tasks.delete_by_id(id),
        )
        .await
    }

    pub async fn get_incomplete_count(&self) -> RelayResult<usize> {
        self.run(
            "get_incomplete_count",
            |medium| async move { medium.incomplete_count().await },
            |tasks| tasks.incomplete_count(),
        )
        .await
    }

    pub async fn get_incomplete(&self) -> RelayResult<Vec<Task>> {
        self.run(
            "get_incomplete",
            |medium| async move { medium.get_incomplete().await },
            |tasks| tasks.get_incomplete(),
        )
        .await
    }

    pub async fn get_by_action(&self, action_name: &str) -> RelayResult<Vec<Task>> {
        let name = action_name.to_string();
        self.run(
            "get_by_action",
            |medium| async move { medium.get_by_action(name).await },
            |tasks| tasks.get_by_action(action_name),
        )
        .await
    }

    /// Deletes every completed task. Exhausted tasks are not completed and
    /// stay until deleted by id.
    pub async fn purge_completed(&self) -> RelayResult<usize> {
        self.run(
            "purge_completed",
            |medium| async move { medium.purge_completed().await },
            |tasks| tasks.purge_completed(),
        )
        .await
    }

    /// Incomplete tasks whose retries are used up.
    pub async fn get_dead_letters(&self, max_retries: u32) -> RelayResult<Vec<Task>> {
        Ok(self
            .get_incomplete()
            .await?
            .into_iter()
            .filter(|task| task.is_exhausted(max_retries))
            .collect())
    }
}

fn merge_retry_count(mut task: Task, stored: &Task) -> Task {
    task.retry_count = task.retry_count.max(stored.retry_count);
    task
}
