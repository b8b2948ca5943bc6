// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use native_db::*;
use native_model::native_model;
use native_model::Model;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::modules::{
    error::{code::ErrorCode, RelayResult},
    store::model::Task,
    utils::{parse_iso8601, to_iso8601},
};
use crate::raise_error;

pub const STATE_INCOMPLETE: u32 = 0;
pub const STATE_COMPLETED: u32 = 1;

pub static TASK_MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut models = Models::new();
    models
        .define::<TaskEntity>()
        .expect("failed to define task model");
    models
});

/// Row layout of the `tasks` table. Every column except `id` is nullable so
/// rows written by older builds still load.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db(
    primary_key(pk -> u64),
    secondary_key(state -> u32),
    secondary_key(action_key -> String)
)]
pub struct TaskEntity {
    pub id: u64,
    pub description: Option<String>,
    pub action_name: Option<String>,
    /// JSON text.
    pub payload: Option<String>,
    /// 0 or 1.
    pub completed: Option<u8>,
    pub retry_count: Option<u32>,
    /// ISO-8601 text.
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl TaskEntity {
    fn pk(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> u32 {
        match self.completed {
            Some(flag) if flag != 0 => STATE_COMPLETED,
            _ => STATE_INCOMPLETE,
        }
    }

    pub fn action_key(&self) -> String {
        self.action_name.clone().unwrap_or_default()
    }

    pub fn from_task(task: &Task, id: u64) -> RelayResult<Self> {
        let payload = serde_json::to_string(&task.payload)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        Ok(Self {
            id,
            description: Some(task.description.clone()),
            action_name: Some(task.action_name.clone()),
            payload: Some(payload),
            completed: Some(task.completed as u8),
            retry_count: Some(task.retry_count),
            created_at: Some(to_iso8601(&task.created_at)),
            updated_at: Some(to_iso8601(&task.updated_at)),
        })
    }
}

fn read_timestamp(id: u64, column: &str, value: Option<&str>) -> DateTime<Utc> {
    match value {
        Some(text) => parse_iso8601(text).unwrap_or_else(|| {
            warn!("Task {} has an unreadable {} '{}'", id, column, text);
            DateTime::<Utc>::default()
        }),
        None => DateTime::<Utc>::default(),
    }
}

impl From<TaskEntity> for Task {
    fn from(entity: TaskEntity) -> Self {
        let payload = match entity.payload {
            Some(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(
                    "Task {} payload is not valid JSON, keeping it as text: {}",
                    entity.id, e
                );
                serde_json::Value::String(text)
            }),
            None => serde_json::Value::Null,
        };
        Task {
            id: Some(entity.id),
            description: entity.description.unwrap_or_default(),
            action_name: entity.action_name.unwrap_or_default(),
            payload,
            completed: entity.completed.is_some_and(|flag| flag != 0),
            retry_count: entity.retry_count.unwrap_or(0),
            created_at: read_timestamp(entity.id, "created_at", entity.created_at.as_deref()),
            updated_at: read_timestamp(entity.id, "updated_at", entity.updated_at.as_deref()),
        }
    }
}
