// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::modules::{
    error::RelayResult,
    metrics::RELAY_INCOMPLETE_TASKS,
    scheduler::{
        executor::{ExecutionSummary, TaskExecutor},
        handlers::TaskHandlers,
        periodic::{PeriodicTask, TaskHandle},
    },
    store::{medium::TaskMedium, model::Task, nativedb::NativeDbTaskMedium, TaskRepository},
};

pub mod executor;
pub mod handlers;
pub mod periodic;
#[cfg(test)]
mod tests;

/// Clears the in-progress flag however the tick ends.
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodically replays incomplete tasks from the store.
pub struct TaskScheduler<M: TaskMedium = NativeDbTaskMedium> {
    store: Arc<TaskRepository<M>>,
    executor: TaskExecutor<M>,
    in_progress: AtomicBool,
}

impl<M: TaskMedium> TaskScheduler<M> {
    pub fn new(store: Arc<TaskRepository<M>>, handlers: TaskHandlers, max_retries: u32) -> Self {
        Self {
            executor: TaskExecutor::new(store.clone(), handlers, max_retries),
            store,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.executor.max_retries()
    }

    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    pub async fn execute_all(&self, tasks: Vec<Task>) -> ExecutionSummary {
        self.executor.execute_all(tasks).await
    }

    /// One scheduler pass. Returns `None` when another pass is still running.
    pub async fn run_tick(&self) -> RelayResult<Option<ExecutionSummary>> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Scheduler tick skipped, previous tick still running");
            return Ok(None);
        }
        let _guard = TickGuard(&self.in_progress);

        let tasks = self.store.get_incomplete().await?;
        RELAY_INCOMPLETE_TASKS.set(tasks.len() as i64);
        if tasks.is_empty() {
            debug!("Scheduler tick found no incomplete tasks");
            return Ok(Some(ExecutionSummary::default()));
        }

        info!("Scheduler tick found {} incomplete tasks", tasks.len());
        let summary = self.executor.execute_all(tasks).await;
        if summary.attempted > 0 {
            info!(
                "Scheduler tick finished: {} attempted, {} succeeded, {} failed, {} dead-lettered",
                summary.attempted, summary.succeeded, summary.failed, summary.dead_lettered
            );
        }
        Ok(Some(summary))
    }

    /// Ticks every `interval` until the process shuts down.
    pub fn start(self: &Arc<Self>, interval: Duration) -> TaskHandle {
        let scheduler = self.clone();
        PeriodicTask::new("task-scheduler").start(
            move || {
                let scheduler = scheduler.clone();
                async move { scheduler.run_tick().await.map(|_| ()) }
            },
            interval,
            false,
        )
    }
}
