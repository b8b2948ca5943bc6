// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::{
    context::{RelayRuntime, RelayTask},
    error::RelayResult,
    scheduler::periodic::TaskHandle,
    settings::cli::SETTINGS,
};
use purge::CompletedTaskPurgeTask;

pub mod purge;

pub struct PeriodicTasks;

impl PeriodicTasks {
    /// Starts the scheduler loop and, when configured, the completed-task purge.
    pub fn start_background_tasks() -> RelayResult<Vec<TaskHandle>> {
        let runtime = RelayRuntime::get()?;
        let mut handles = vec![runtime.scheduler.start(SETTINGS.scheduler_interval())];
        if SETTINGS.relay_purge_interval_secs.is_some() {
            handles.push(CompletedTaskPurgeTask::start());
        }
        Ok(handles)
    }
}
