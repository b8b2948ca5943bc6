// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::Arc;
use std::time::Duration;

use poem_openapi::{Enum, Object};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::modules::{
    batch::{Batch, BatchAccumulator},
    delivery::{deliver_batch, Deliver, DeliveryTarget, HttpDeliveryClient},
    error::{code::ErrorCode, RelayResult},
    interceptor::{
        action::{ActionType, AppAction},
        state::{AppState, StateSnapshot},
    },
    metrics::{
        RELAY_ACTIONS_DISPATCHED_TOTAL, RELAY_ACTIONS_DROPPED_TOTAL, RELAY_TASKS_PERSISTED_TOTAL,
    },
    settings::cli::Settings,
    store::{
        medium::TaskMedium,
        model::{Task, LIKE_SYNC_ACTION, TELEMETRY_ACTION},
        nativedb::NativeDbTaskMedium,
        TaskRepository,
    },
};
use crate::raise_error;

pub mod action;
pub mod state;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Enum)]
pub enum DeliveryStatus {
    Delivered,
    /// Delivery failed and a task was stored for the scheduler.
    Deferred,
    /// Delivery failed and the task could not be stored either.
    Lost,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct FlushOutcome {
    pub batch_id: u64,
    pub items: usize,
    pub status: DeliveryStatus,
    pub task_id: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct LikeSyncOutcome {
    pub attempts: u32,
    pub status: DeliveryStatus,
    pub task_id: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub action_type: ActionType,
    /// False when the action was dropped as malformed.
    pub queued: bool,
    /// Items waiting in the batch after this dispatch.
    pub pending: usize,
    pub flush: Option<FlushOutcome>,
    pub like_sync: Option<LikeSyncOutcome>,
}

#[derive(Clone, Copy, Debug)]
pub struct LikeSyncConfig {
    pub enabled: bool,
    pub attempts: u32,
    pub base_delay: Duration,
}

impl LikeSyncConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            enabled: settings.relay_like_sync_enabled,
            attempts: settings.relay_like_sync_attempts.max(1),
            base_delay: Duration::from_millis(settings.relay_like_sync_base_delay_ms),
        }
    }
}

/// Entry point for application actions. Updates local state first, then
/// batches the action for telemetry and defers anything that cannot be
/// delivered to the task store.
pub struct ActionInterceptor<M: TaskMedium = NativeDbTaskMedium, D: Deliver = HttpDeliveryClient> {
    state: RwLock<AppState>,
    accumulator: Mutex<BatchAccumulator>,
    delivery: Arc<D>,
    store: Arc<TaskRepository<M>>,
    like_sync: LikeSyncConfig,
}

impl<M: TaskMedium, D: Deliver> ActionInterceptor<M, D> {
    pub fn new(
        store: Arc<TaskRepository<M>>,
        delivery: Arc<D>,
        batch_max_size: usize,
        like_sync: LikeSyncConfig,
    ) -> Self {
        Self {
            state: RwLock::new(AppState::default()),
            accumulator: Mutex::new(BatchAccumulator::new(batch_max_size)),
            delivery,
            store,
            like_sync,
        }
    }

    pub async fn dispatch(&self, action: AppAction) -> DispatchOutcome {
        let action_type = action.action_type;
        self.state.write().await.apply(&action);
        RELAY_ACTIONS_DISPATCHED_TOTAL
            .with_label_values(&[action_type.label()])
            .inc();

        // the accumulator guard is released before any delivery happens
        let enqueued = match BatchAccumulator::convert_to_batch_item(&action) {
            Ok(item) => self.accumulator.lock().await.enqueue(item),
            Err(e) => Err(e),
        };
        let response = match enqueued {
            Ok(response) => response,
            Err(e) => {
                error!("Dropping {} action: {}", action_type.label(), e);
                RELAY_ACTIONS_DROPPED_TOTAL
                    .with_label_values(&[action_type.label()])
                    .inc();
                return DispatchOutcome {
                    action_type,
                    queued: false,
                    pending: self.pending_len().await,
                    flush: None,
                    like_sync: None,
                };
            }
        };

        let (pending, flush) = if response.is_flushed {
            (0, Some(self.deliver_or_defer(response.batch).await))
        } else {
            (response.batch.queue.len(), None)
        };

        // the action is already queued, so a flush during the backoff includes it
        let like_sync = if self.like_sync.enabled && action_type.is_like_toggle() {
            Some(self.sync_like(&action).await)
        } else {
            None
        };

        DispatchOutcome {
            action_type,
            queued: true,
            pending,
            flush,
            like_sync,
        }
    }

    /// Delivers whatever is queued. Returns `None` when the queue is empty.
    pub async fn flush(&self) -> Option<FlushOutcome> {
        let response = self.accumulator.lock().await.flush();
        if response.batch.queue.is_empty() {
            return None;
        }
        Some(self.deliver_or_defer(response.batch).await)
    }

    pub async fn pending_len(&self) -> usize {
        self.accumulator.lock().await.len()
    }

    pub async fn snapshot(&self) -> StateSnapshot {
        self.state.read().await.snapshot()
    }

    async fn deliver_or_defer(&self, batch: Batch) -> FlushOutcome {
        let items = batch.queue.len();
        match deliver_batch(self.delivery.as_ref(), &batch).await {
            Ok(_) => {
                info!("Batch {} with {} items delivered", batch.batch_id, items);
                FlushOutcome {
                    batch_id: batch.batch_id,
                    items,
                    status: DeliveryStatus::Delivered,
                    task_id: None,
                }
            }
            Err(e) => {
                error!(
                    "Batch {} could not be delivered, deferring it: {}",
                    batch.batch_id, e
                );
                let task_id = match serde_json::to_value(&batch.queue) {
                    Ok(payload) => {
                        let task = Task::new(
                            format!("Batch telemetry {}", batch.batch_id),
                            TELEMETRY_ACTION,
                            payload,
                        );
                        self.persist(task).await
                    }
                    Err(e) => {
                        error!("Batch {} could not be serialized: {:#?}", batch.batch_id, e);
                        None
                    }
                };
                FlushOutcome {
                    batch_id: batch.batch_id,
                    items,
                    status: deferred_or_lost(task_id),
                    task_id,
                }
            }
        }
    }

    async fn sync_like(&self, action: &AppAction) -> LikeSyncOutcome {
        let target = match action.action_type {
            ActionType::Unlike => DeliveryTarget::Unlike,
            _ => DeliveryTarget::Like,
        };
        let (attempts, result) = retry_async(
            self.like_sync.attempts,
            self.like_sync.base_delay,
            || self.delivery.deliver(target, action.payload.clone()),
        )
        .await;

        match result {
            Ok(_) => LikeSyncOutcome {
                attempts,
                status: DeliveryStatus::Delivered,
                task_id: None,
            },
            Err(e) => {
                error!(
                    "{} sync failed after {} attempts, deferring it: {}",
                    action.action_type.label(),
                    attempts,
                    e
                );
                let task_id = match serde_json::to_value(action) {
                    Ok(payload) => {
                        let task = Task::new(
                            format!("Sync {}", action.action_type.label()),
                            LIKE_SYNC_ACTION,
                            payload,
                        );
                        self.persist(task).await
                    }
                    Err(e) => {
                        error!("Like action could not be serialized: {:#?}", e);
                        None
                    }
                };
                LikeSyncOutcome {
                    attempts,
                    status: deferred_or_lost(task_id),
                    task_id,
                }
            }
        }
    }

    async fn persist(&self, task: Task) -> Option<u64> {
        let action_name = task.action_name.clone();
        match self.store.insert(task).await {
            Ok(stored) => {
                RELAY_TASKS_PERSISTED_TOTAL
                    .with_label_values(&[action_name.as_str()])
                    .inc();
                info!("Stored {} task {:?} for retry", action_name, stored.id);
                stored.id
            }
            Err(e) => {
                error!("Failed to store {} task: {}", action_name, e);
                None
            }
        }
    }
}

fn deferred_or_lost(task_id: Option<u64>) -> DeliveryStatus {
    match task_id {
        Some(_) => DeliveryStatus::Deferred,
        None => DeliveryStatus::Lost,
    }
}

/// Runs `operation` up to `attempts` times, sleeping `base_delay * 2^n` after
/// the n-th failure. Returns the number of attempts made with the last result.
pub async fn retry_async<T, F, Fut>(
    attempts: u32,
    base_delay: Duration,
    mut operation: F,
) -> (u32, RelayResult<T>)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = RelayResult<T>>,
{
    let attempts = attempts.max(1);
    let mut last_error = None;
    for attempt in 0..attempts {
        match operation().await {
            Ok(value) => return (attempt + 1, Ok(value)),
            Err(e) => {
                warn!("Attempt {}/{} failed: {}", attempt + 1, attempts, e);
                last_error = Some(e);
                if attempt + 1 < attempts {
                    let factor = 2u32.saturating_pow(attempt);
                    tokio::time::sleep(base_delay.saturating_mul(factor)).await;
                }
            }
        }
    }
    let error = last_error.unwrap_or_else(|| {
        raise_error!("retry loop made no attempt".into(), ErrorCode::InternalError)
    });
    (attempts, Err(error))
}
