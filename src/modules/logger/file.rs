// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::logger::{env_filter, LocalTimer};
use crate::modules::settings::cli::SETTINGS;
use crate::modules::settings::dir::DATA_DIR_MANAGER;
use std::sync::OnceLock;
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;

pub static LOG_WORKER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub fn setup_file_logger(level: Level) -> Result<(), Box<dyn std::error::Error>> {
    let (server_nonb, server_guard) = server_log_writer()?;
    let _ = LOG_WORKER_GUARD.set(server_guard);

    let server_layer = fmt::layer()
        .with_timer(LocalTimer)
        .with_ansi(SETTINGS.relay_ansi_logs)
        .with_level(true)
        .with_writer(server_nonb)
        .with_target(true);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(server_layer);

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn server_log_writer() -> Result<(NonBlocking, WorkerGuard), InitError> {
    std::fs::create_dir_all(&DATA_DIR_MANAGER.log_dir).ok();
    let rolling = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("relay")
        .max_log_files(SETTINGS.relay_max_server_log_files)
        .build(DATA_DIR_MANAGER.log_dir.clone())?;
    Ok(tracing_appender::non_blocking(rolling))
}
