// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use mimalloc::MiMalloc;
use modules::{
    context::{Initialize, RelayRuntime},
    error::RelayResult,
    logger,
    rest::start_http_server,
    scheduler::periodic::TaskHandle,
    tasks::PeriodicTasks,
};
use tracing::{error, info, warn};

use crate::modules::{
    common::signal::{SignalManager, SIGNAL_MANAGER},
    interceptor::DeliveryStatus,
    metrics::MetricsService,
    settings::dir::DataDirManager,
};

mod modules;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> RelayResult<()> {
    logger::initialize_logging();
    info!("Starting actionrelay");
    info!("Version:  {}", relay_version!());
    info!("Git:      [{}]", env!("GIT_HASH"));

    let handles = match initialize().await {
        Ok(handles) => handles,
        Err(error) => {
            eprintln!("{:?}", error);
            return Err(error);
        }
    };

    let result = start_http_server().await;
    if let Err(e) = &result {
        error!("Failed to start REST server: {}", e);
        SIGNAL_MANAGER.trigger();
    }
    for handle in handles {
        handle.join().await;
    }
    flush_after_shutdown().await;
    result
}

/// Initialize the system and start the background tasks.
async fn initialize() -> RelayResult<Vec<TaskHandle>> {
    SignalManager::initialize().await?;
    DataDirManager::initialize().await?;
    MetricsService::initialize().await?;
    RelayRuntime::initialize().await?;
    PeriodicTasks::start_background_tasks()
}

/// Delivers whatever is still queued, storing it as a task if that fails.
async fn flush_after_shutdown() {
    let runtime = match RelayRuntime::get() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Skipping final flush: {}", e);
            return;
        }
    };
    match runtime.interceptor.flush().await {
        None => info!("No pending actions at shutdown"),
        Some(outcome) if outcome.status == DeliveryStatus::Delivered => {
            info!("Pending batch of {} actions delivered at shutdown", outcome.items)
        }
        Some(outcome) => warn!(
            "Pending batch of {} actions not delivered at shutdown ({:?}, task {:?})",
            outcome.items, outcome.status, outcome.task_id
        ),
    }
}
