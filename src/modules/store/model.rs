// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use chrono::{DateTime, Utc};
use poem_openapi::Object;
use serde::{Deserialize, Serialize};

use crate::modules::utils::now_millis;

/// Action name of a batch that could not be delivered to the telemetry endpoint.
pub const TELEMETRY_ACTION: &str = "TELEMETRY";
/// Action name of a like/unlike that exhausted its in-process retries.
pub const LIKE_SYNC_ACTION: &str = "LIKE_SYNC";

/// A deferred unit of work kept until it is delivered or exhausts its retries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct Task {
    /// Assigned by the store on first insert.
    pub id: Option<u64>,
    pub description: String,
    /// Selects the handler that replays the task, e.g. `TELEMETRY`.
    pub action_name: String,
    /// Everything the handler needs to replay the action.
    pub payload: serde_json::Value,
    pub completed: bool,
    /// Number of failed attempts so far. Never decreases.
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        description: impl Into<String>,
        action_name: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        let now = now_millis();
        Self {
            id: None,
            description: description.into(),
            action_name: action_name.into(),
            payload,
            completed: false,
            retry_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at);
    }

    pub fn is_exhausted(&self, max_retries: u32) -> bool {
        !self.completed && self.retry_count >= max_retries
    }
}
