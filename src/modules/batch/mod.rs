// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use poem_openapi::Object;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::{
    modules::{
        error::{code::ErrorCode, RelayResult},
        interceptor::action::{ActionType, AppAction},
        metrics::{RELAY_BATCHES_FLUSHED_TOTAL, RELAY_PENDING_BATCH_SIZE},
    },
    raise_error,
};

#[cfg(test)]
mod tests;

/// One normalized action waiting for delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct BatchItem {
    pub pk: String,
    pub sk: String,
    /// Lower-case label such as `like` or `bookmark`.
    pub action_type: String,
}

impl BatchItem {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>, action_type: ActionType) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
            action_type: action_type.label().into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct Batch {
    /// Random identifier, only used in logs.
    pub batch_id: u64,
    /// Items in insertion order.
    pub queue: Vec<BatchItem>,
}

impl Batch {
    fn fresh() -> Self {
        Self {
            batch_id: rand::random(),
            queue: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Object)]
#[serde(rename_all = "camelCase")]
#[oai(rename_all = "camelCase")]
pub struct BatchResponse {
    pub batch: Batch,
    pub is_flushed: bool,
}

/// Bounded FIFO of batch items, flushed as soon as it fills up.
pub struct BatchAccumulator {
    max_size: usize,
    batch: Batch,
}

impl BatchAccumulator {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            batch: Batch::fresh(),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.batch.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.queue.is_empty()
    }

    /// Appends an item. When this fills the queue the flushed batch is returned
    /// with `is_flushed = true`, otherwise a snapshot of the pending batch.
    pub fn enqueue(&mut self, item: BatchItem) -> RelayResult<BatchResponse> {
        if item.pk.is_empty() || item.sk.is_empty() {
            error!(
                "Rejected batch item with empty key: pk='{}', sk='{}', actionType='{}'",
                item.pk, item.sk, item.action_type
            );
            return Err(raise_error!(
                "Batch items require a non-empty pk and sk".into(),
                ErrorCode::MalformedAction
            ));
        }

        self.batch.queue.push(item);
        RELAY_PENDING_BATCH_SIZE.set(self.len() as i64);

        if self.len() >= self.max_size {
            info!(
                "Batch {} reached {} items",
                self.batch.batch_id, self.max_size
            );
            return Ok(self.flush());
        }

        Ok(BatchResponse {
            batch: self.batch.clone(),
            is_flushed: false,
        })
    }

    /// Empties the queue and hands its previous contents to the caller.
    pub fn flush(&mut self) -> BatchResponse {
        let batch = std::mem::replace(&mut self.batch, Batch::fresh());
        RELAY_PENDING_BATCH_SIZE.set(0);
        if !batch.queue.is_empty() {
            RELAY_BATCHES_FLUSHED_TOTAL.inc();
            info!(
                "Flushing batch {} with {} items",
                batch.batch_id,
                batch.queue.len()
            );
        }
        BatchResponse {
            batch,
            is_flushed: true,
        }
    }

    /// Maps an application action to a batch item. Bookmark payloads are a map
    /// keyed by item hash and the subject is read from their first entry; the
    /// other kinds carry `pk` and `sk` at the top level.
    pub fn convert_to_batch_item(action: &AppAction) -> RelayResult<BatchItem> {
        let subject = match action.action_type {
            ActionType::AddBookmark | ActionType::RemoveBookmark => action
                .payload
                .as_object()
                .and_then(|entries| entries.values().next())
                .ok_or_else(|| {
                    malformed(action.action_type, "payload must map an item hash to an item")
                })?,
            ActionType::Like | ActionType::Unlike | ActionType::Share => &action.payload,
        };

        let pk = key_field(subject, "pk")
            .ok_or_else(|| malformed(action.action_type, "missing 'pk'"))?;
        let sk = key_field(subject, "sk")
            .ok_or_else(|| malformed(action.action_type, "missing 'sk'"))?;
        Ok(BatchItem::new(pk, sk, action.action_type))
    }
}

/// Reads a subject key given as a non-empty string or a number.
pub fn key_field(subject: &Value, name: &str) -> Option<String> {
    match subject.get(name)? {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn malformed(action_type: ActionType, reason: &str) -> crate::modules::error::RelayError {
    raise_error!(
        format!("Malformed {} action: {}", action_type.label(), reason),
        ErrorCode::MalformedAction
    )
}
