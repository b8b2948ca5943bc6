// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::{BTreeMap, BTreeSet};

use poem_openapi::Object;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::modules::{
    batch::key_field,
    interceptor::action::{ActionType, AppAction},
};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Object)]
pub struct SubjectKey {
    pub pk: String,
    pub sk: String,
}

impl SubjectKey {
    fn from_payload(payload: &Value) -> Option<Self> {
        Some(Self {
            pk: key_field(payload, "pk")?,
            sk: key_field(payload, "sk")?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Object)]
pub struct ShareCount {
    pub subject: SubjectKey,
    pub count: u64,
}

/// Snapshot of the local state exposed over the API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Object)]
pub struct StateSnapshot {
    pub liked: Vec<SubjectKey>,
    /// Bookmarked items keyed by item hash.
    pub bookmarks: BTreeMap<String, Value>,
    pub shares: Vec<ShareCount>,
}

/// Local, optimistic view of the user's actions. Updated before any network or
/// storage work and never rolled back.
#[derive(Debug, Default)]
pub struct AppState {
    liked: BTreeSet<SubjectKey>,
    bookmarks: BTreeMap<String, Value>,
    shares: BTreeMap<SubjectKey, u64>,
}

impl AppState {
    /// Returns whether the action changed anything.
    pub fn apply(&mut self, action: &AppAction) -> bool {
        let changed = match action.action_type {
            ActionType::Like => SubjectKey::from_payload(&action.payload)
                .is_some_and(|subject| self.liked.insert(subject)),
            ActionType::Unlike => SubjectKey::from_payload(&action.payload)
                .is_some_and(|subject| self.liked.remove(&subject)),
            ActionType::AddBookmark => match action.payload.as_object() {
                Some(entries) => {
                    for (hash, item) in entries {
                        self.bookmarks.insert(hash.clone(), item.clone());
                    }
                    !entries.is_empty()
                }
                None => false,
            },
            // a bare item hash is accepted as well as the keyed map
            ActionType::RemoveBookmark => match &action.payload {
                Value::Object(entries) => entries.keys().fold(false, |removed, hash| {
                    self.bookmarks.remove(hash).is_some() || removed
                }),
                Value::String(hash) => self.bookmarks.remove(hash).is_some(),
                _ => false,
            },
            ActionType::Share => match SubjectKey::from_payload(&action.payload) {
                Some(subject) => {
                    *self.shares.entry(subject).or_insert(0) += 1;
                    true
                }
                None => false,
            },
        };
        if !changed {
            debug!("{} action left local state unchanged", action.action_type.label());
        }
        changed
    }

    pub fn is_liked(&self, subject: &SubjectKey) -> bool {
        self.liked.contains(subject)
    }

    pub fn is_bookmarked(&self, item_hash: &str) -> bool {
        self.bookmarks.contains_key(item_hash)
    }

    pub fn share_count(&self, subject: &SubjectKey) -> u64 {
        self.shares.get(subject).copied().unwrap_or(0)
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            liked: self.liked.iter().cloned().collect(),
            bookmarks: self.bookmarks.clone(),
            shares: self
                .shares
                .iter()
                .map(|(subject, count)| ShareCount {
                    subject: subject.clone(),
                    count: *count,
                })
                .collect(),
        }
    }
}
