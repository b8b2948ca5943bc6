// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use poem_openapi::{Enum, Object};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Enum)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[oai(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Like,
    Unlike,
    AddBookmark,
    RemoveBookmark,
    Share,
}

impl ActionType {
    /// Label sent to the telemetry endpoint.
    pub fn label(&self) -> &'static str {
        match self {
            ActionType::Like => "like",
            ActionType::Unlike => "unlike",
            ActionType::AddBookmark => "bookmark",
            ActionType::RemoveBookmark => "unbookmark",
            ActionType::Share => "share",
        }
    }

    pub fn is_like_toggle(&self) -> bool {
        matches!(self, ActionType::Like | ActionType::Unlike)
    }
}

/// An application state change in `{type, payload}` form.
///
/// `LIKE`, `UNLIKE` and `SHARE` carry `{pk, sk, ...}`. Bookmark actions carry a
/// map from item hash to the bookmarked item, which itself has `pk` and `sk`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Object)]
pub struct AppAction {
    #[serde(rename = "type")]
    #[oai(rename = "type")]
    pub action_type: ActionType,
    pub payload: Value,
}

impl AppAction {
    pub fn new(action_type: ActionType, payload: Value) -> Self {
        Self {
            action_type,
            payload,
        }
    }
}
