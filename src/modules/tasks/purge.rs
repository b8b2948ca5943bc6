// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::{
    context::{RelayRuntime, RelayTask},
    scheduler::periodic::{PeriodicTask, TaskHandle},
    settings::cli::SETTINGS,
};
use std::time::Duration;
use tracing::info;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Deletes delivered tasks. Dead-lettered tasks are left alone.
pub struct CompletedTaskPurgeTask;

impl RelayTask for CompletedTaskPurgeTask {
    fn start() -> TaskHandle {
        let interval = SETTINGS
            .relay_purge_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_INTERVAL);

        PeriodicTask::new("completed-task-purger").start(
            || async {
                let removed = RelayRuntime::get()?.store.purge_completed().await?;
                if removed > 0 {
                    info!("Purged {} completed tasks", removed);
                }
                Ok(())
            },
            interval,
            false,
        )
    }
}
