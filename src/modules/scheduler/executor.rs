// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;

use poem_openapi::Object;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::modules::{
    metrics::{FAILURE, RELAY_TASKS_DEAD_LETTERED_TOTAL, RELAY_TASK_EXECUTIONS_TOTAL, SUCCESS},
    scheduler::handlers::TaskHandlers,
    store::{medium::TaskMedium, model::Task, TaskRepository},
};

/// Outcome counts of one `execute_all` pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Object)]
pub struct ExecutionSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Tasks whose failed attempt used up the last retry.
    pub dead_lettered: usize,
    /// Completed or already exhausted tasks that were left alone.
    pub skipped: usize,
}

pub struct TaskExecutor<M: TaskMedium> {
    store: Arc<TaskRepository<M>>,
    handlers: TaskHandlers,
    max_retries: u32,
}

impl<M: TaskMedium> TaskExecutor<M> {
    pub fn new(store: Arc<TaskRepository<M>>, handlers: TaskHandlers, max_retries: u32) -> Self {
        Self {
            store,
            handlers,
            max_retries,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Attempts every runnable task once, in order. A failing or panicking
    /// task never stops the rest of the pass.
    pub async fn execute_all(&self, tasks: Vec<Task>) -> ExecutionSummary {
        let mut summary = ExecutionSummary::default();

        for mut task in tasks {
            if task.completed || task.retry_count >= self.max_retries {
                summary.skipped += 1;
                continue;
            }

            summary.attempted += 1;
            let attempt = self.handlers.execute(task.clone()).await;
            if attempt.is_success() {
                task.completed = true;
                summary.succeeded += 1;
                RELAY_TASK_EXECUTIONS_TOTAL
                    .with_label_values(&[SUCCESS])
                    .inc();
                info!(
                    "Task {:?} ({}) delivered after {} failed attempts, took {:?}",
                    task.id, task.action_name, task.retry_count, attempt.duration
                );
            } else {
                task.retry_count += 1;
                summary.failed += 1;
                RELAY_TASK_EXECUTIONS_TOTAL
                    .with_label_values(&[FAILURE])
                    .inc();
                if task.retry_count >= self.max_retries {
                    summary.dead_lettered += 1;
                    RELAY_TASKS_DEAD_LETTERED_TOTAL.inc();
                    warn!(
                        "Task {:?} ({}) exhausted {} attempts and is dead-lettered",
                        task.id, task.action_name, self.max_retries
                    );
                }
            }
            task.touch();

            match self.store.update_if_present(task.clone()).await {
                Ok(Some(_)) => {}
                Ok(None) => debug!(
                    "Task {:?} was deleted during its attempt, outcome discarded",
                    task.id
                ),
                Err(e) => error!("Failed to record the outcome of task {:?}: {}", task.id, e),
            }
        }

        summary
    }
}
