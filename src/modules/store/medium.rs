// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::{error::RelayResult, store::model::Task};
use std::future::Future;

/// A durable home for tasks. Any error returned here makes the repository
/// fall back to its volatile list.
pub trait TaskMedium: Clone + Send + Sync + 'static {
    /// Writes or overwrites a task, assigning an id when it has none.
    fn insert(&self, task: Task) -> impl Future<Output = RelayResult<Task>> + Send;

    /// Inserts all tasks in a single transaction.
    fn insert_many(&self, tasks: Vec<Task>)
        -> impl Future<Output = RelayResult<Vec<Task>>> + Send;

    fn get_all(&self) -> impl Future<Output = RelayResult<Vec<Task>>> + Send;

    fn get_by_id(&self, id: u64) -> impl Future<Output = RelayResult<Option<Task>>> + Send;

    /// Succeeds when the id is absent.
    fn delete_by_id(&self, id: u64) -> impl Future<Output = RelayResult<()>> + Send;

    fn incomplete_count(&self) -> impl Future<Output = RelayResult<usize>> + Send;

    fn get_incomplete(&self) -> impl Future<Output = RelayResult<Vec<Task>>> + Send;

    fn get_by_action(
        &self,
        action_name: String,
    ) -> impl Future<Output = RelayResult<Vec<Task>>> + Send;

    fn purge_completed(&self) -> impl Future<Output = RelayResult<usize>> + Send;
}
