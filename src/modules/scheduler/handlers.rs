// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::delivery::{Deliver, DeliveryTarget};
use crate::modules::error::code::ErrorCode;
use crate::modules::error::{RelayError, RelayResult};
use crate::modules::interceptor::action::{ActionType, AppAction};
use crate::modules::store::model::{Task, LIKE_SYNC_ACTION, TELEMETRY_ACTION};
use crate::raise_error;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use std::{future::Future, pin::Pin, sync::Arc};
use tracing::{debug, warn};

// A handler replays one task and resolves once the remote side accepted it.
pub type Handler =
    Arc<dyn Fn(Task) -> Pin<Box<dyn Future<Output = Result<(), RelayError>> + Send>> + Send + Sync>;

#[derive(Debug)]
pub struct TaskAttempt {
    pub task_id: Option<u64>,
    pub duration: Duration,
    pub result: RelayResult<()>,
}

impl TaskAttempt {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Handlers keyed by task action name.
#[derive(Clone, Default)]
pub struct TaskHandlers {
    handlers: HashMap<String, Handler>,
}

impl TaskHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// `TELEMETRY` tasks re-send their payload to the telemetry endpoint and
    /// `LIKE_SYNC` tasks re-send the stored like/unlike.
    pub fn with_delivery<D: Deliver>(delivery: Arc<D>) -> Self {
        let mut handlers = Self::new();
        let telemetry = delivery.clone();
        handlers.register(TELEMETRY_ACTION, move |task: Task| {
            let delivery = telemetry.clone();
            async move {
                delivery
                    .deliver(DeliveryTarget::Telemetry, task.payload)
                    .await
                    .map(|_| ())
            }
        });
        handlers.register(LIKE_SYNC_ACTION, move |task: Task| {
            let delivery = delivery.clone();
            async move {
                let (target, payload) = like_sync_request(task.payload)?;
                delivery.deliver(target, payload).await.map(|_| ())
            }
        });
        handlers
    }

    pub fn register<F, Fut>(&mut self, action_name: &str, handler: F)
    where
        F: Fn(Task) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RelayResult<()>> + Send + 'static,
    {
        self.handlers.insert(
            action_name.to_owned(),
            Arc::new(move |task| Box::pin(handler(task))),
        );
    }

    pub fn contains(&self, action_name: &str) -> bool {
        self.handlers.contains_key(action_name)
    }

    /// Runs the handler for `task` on its own tokio task so a panic inside a
    /// handler is reported as a failed attempt.
    pub async fn execute(&self, task: Task) -> TaskAttempt {
        let task_id = task.id;
        let action_name = task.action_name.clone();
        let start = Instant::now();

        let Some(handler) = self.handlers.get(&action_name).cloned() else {
            warn!(
                "No handler registered for action '{}' (task {:?})",
                action_name, task_id
            );
            return TaskAttempt {
                task_id,
                duration: start.elapsed(),
                result: Err(raise_error!(
                    format!("Unrecognized task action '{}'", action_name),
                    ErrorCode::InternalError
                )),
            };
        };

        let result = match tokio::spawn(async move { (handler)(task).await }).await {
            Ok(Ok(())) => {
                debug!(
                    "Task '{{{action_name}-{task_id:?}}}' executed successfully, took {:?}",
                    start.elapsed()
                );
                Ok(())
            }
            Ok(Err(e)) => {
                warn!("Task '{{{action_name}-{task_id:?}}}' errored, {e}");
                Err(e)
            }
            Err(e) if e.is_panic() => {
                warn!("Task '{{{action_name}-{task_id:?}}}' panicked");
                Err(raise_error!("Task panicked".into(), ErrorCode::InternalError))
            }
            Err(e) => Err(raise_error!(
                format!("task failed unexpectedly: {:?}", e),
                ErrorCode::InternalError
            )),
        };

        TaskAttempt {
            task_id,
            duration: start.elapsed(),
            result,
        }
    }
}

/// Payload of a `LIKE_SYNC` task: the original action.
fn like_sync_request(payload: serde_json::Value) -> RelayResult<(DeliveryTarget, serde_json::Value)> {
    let action: AppAction = serde_json::from_value(payload)
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::MalformedAction))?;
    let target = match action.action_type {
        ActionType::Like => DeliveryTarget::Like,
        ActionType::Unlike => DeliveryTarget::Unlike,
        other => {
            return Err(raise_error!(
                format!("{} is not a like toggle", other.label()),
                ErrorCode::MalformedAction
            ))
        }
    };
    Ok((target, action.payload))
}
