// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::LazyLock;

use crate::relay_version;
use crate::{
    modules::{context::Initialize, error::RelayResult},
    utc_now,
};
use prometheus::{
    register_gauge, register_gauge_vec, register_histogram_vec, register_int_counter,
    register_int_counter_vec, register_int_gauge, Gauge, GaugeVec, HistogramVec, IntCounter,
    IntCounterVec, IntGauge,
};

pub mod endpoint;

pub const SUCCESS: &str = "success";
pub const FAILURE: &str = "failure";

// Metric name constants
pub const METRIC_REQUEST_DURATION_BY_STATUS: &str = "actionrelay_request_duration_seconds_by_status";
pub const METRIC_REQUEST_TOTAL_BY_METHOD_AND_OPERATION: &str =
    "actionrelay_request_total_by_method_and_operation";
pub const METRIC_ACTIONS_DISPATCHED_TOTAL: &str = "actionrelay_actions_dispatched_total";
pub const METRIC_ACTIONS_DROPPED_TOTAL: &str = "actionrelay_actions_dropped_total";
pub const METRIC_BATCHES_FLUSHED_TOTAL: &str = "actionrelay_batches_flushed_total";
pub const METRIC_DELIVERY_TOTAL: &str = "actionrelay_delivery_total";
pub const METRIC_DELIVERY_DURATION_SECONDS: &str = "actionrelay_delivery_duration_seconds";
pub const METRIC_TASKS_PERSISTED_TOTAL: &str = "actionrelay_tasks_persisted_total";
pub const METRIC_TASK_EXECUTIONS_TOTAL: &str = "actionrelay_task_executions_total";
pub const METRIC_TASKS_DEAD_LETTERED_TOTAL: &str = "actionrelay_tasks_dead_lettered_total";
pub const METRIC_STORAGE_FALLBACK_TOTAL: &str = "actionrelay_storage_fallback_total";
pub const METRIC_PENDING_BATCH_SIZE: &str = "actionrelay_pending_batch_size";
pub const METRIC_INCOMPLETE_TASKS: &str = "actionrelay_incomplete_tasks";
pub const METRIC_BUILD_INFO: &str = "actionrelay_build_info";
pub const METRIC_START_TIMESTAMP: &str = "actionrelay_start_timestamp";

pub static RELAY_BUILD_INFO: LazyLock<GaugeVec> = LazyLock::new(|| {
    register_gauge_vec!(
        METRIC_BUILD_INFO,
        "Build information including version and commit hash",
        &["version", "commit"]
    )
    .expect("Failed to register actionrelay_build_info")
});

pub static RELAY_START_TIMESTAMP: LazyLock<Gauge> = LazyLock::new(|| {
    register_gauge!(
        METRIC_START_TIMESTAMP,
        "Unix timestamp when actionrelay started"
    )
    .expect("Failed to register actionrelay_start_timestamp")
});

pub static RELAY_REQUEST_DURATION_BY_STATUS: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        METRIC_REQUEST_DURATION_BY_STATUS,
        "Distribution of HTTP request durations, measured in seconds, grouped by response status code",
        &["status"]
    )
    .expect("Failed to register request_duration_seconds_by_status")
});

pub static RELAY_REQUEST_TOTAL_BY_METHOD_AND_OPERATION: LazyLock<IntCounterVec> =
    LazyLock::new(|| {
        register_int_counter_vec!(
            METRIC_REQUEST_TOTAL_BY_METHOD_AND_OPERATION,
            "Total number of HTTP requests, grouped by method, operation ID, and status code",
            &["method", "operation_id", "status"]
        )
        .expect("Failed to register request_total_by_method_and_operation")
    });

pub static RELAY_ACTIONS_DISPATCHED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        METRIC_ACTIONS_DISPATCHED_TOTAL,
        "Total number of actions passed through the interceptor, grouped by action type",
        &["action"]
    )
    .expect("Failed to register actionrelay_actions_dispatched_total")
});

pub static RELAY_ACTIONS_DROPPED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        METRIC_ACTIONS_DROPPED_TOTAL,
        "Total number of actions rejected before reaching the batch, grouped by action type",
        &["action"]
    )
    .expect("Failed to register actionrelay_actions_dropped_total")
});

pub static RELAY_BATCHES_FLUSHED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        METRIC_BATCHES_FLUSHED_TOTAL,
        "Total number of non-empty batches flushed"
    )
    .expect("Failed to register actionrelay_batches_flushed_total")
});

pub static RELAY_DELIVERY_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        METRIC_DELIVERY_TOTAL,
        "Total number of delivery attempts, grouped by target and status",
        &["target", "status"]
    )
    .expect("Failed to register actionrelay_delivery_total")
});

pub static RELAY_DELIVERY_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        METRIC_DELIVERY_DURATION_SECONDS,
        "Distribution of delivery durations, measured in seconds",
        &["target", "status"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to register actionrelay_delivery_duration_seconds")
});

pub static RELAY_TASKS_PERSISTED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        METRIC_TASKS_PERSISTED_TOTAL,
        "Total number of deferred tasks written to the task store, grouped by action name",
        &["action_name"]
    )
    .expect("Failed to register actionrelay_tasks_persisted_total")
});

pub static RELAY_TASK_EXECUTIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        METRIC_TASK_EXECUTIONS_TOTAL,
        "Total number of scheduled task executions, grouped by status",
        &["status"]
    )
    .expect("Failed to register actionrelay_task_executions_total")
});

pub static RELAY_TASKS_DEAD_LETTERED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        METRIC_TASKS_DEAD_LETTERED_TOTAL,
        "Total number of tasks that exhausted their retries"
    )
    .expect("Failed to register actionrelay_tasks_dead_lettered_total")
});

pub static RELAY_STORAGE_FALLBACK_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!(
        METRIC_STORAGE_FALLBACK_TOTAL,
        "Number of times the task store fell back to the volatile list"
    )
    .expect("Failed to register actionrelay_storage_fallback_total")
});

pub static RELAY_PENDING_BATCH_SIZE: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge!(
        METRIC_PENDING_BATCH_SIZE,
        "Number of items waiting in the current batch"
    )
    .expect("Failed to register actionrelay_pending_batch_size")
});

pub static RELAY_INCOMPLETE_TASKS: LazyLock<IntGauge> = LazyLock::new(|| {
    register_int_gauge!(
        METRIC_INCOMPLETE_TASKS,
        "Number of incomplete tasks seen by the last scheduler tick"
    )
    .expect("Failed to register actionrelay_incomplete_tasks")
});

pub struct MetricsService;

impl Initialize for MetricsService {
    async fn initialize() -> RelayResult<()> {
        let now = utc_now!();
        RELAY_START_TIMESTAMP.set(now as f64);
        let version = relay_version!();
        let commit = env!("GIT_HASH");
        RELAY_BUILD_INFO
            .with_label_values(&[version, commit])
            .set(1.0);
        Ok(())
    }
}
